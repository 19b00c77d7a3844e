//! Command text and parameter accumulation.

use serde::Serialize;

use super::traits::SqlGenerator;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandParameter {
    pub name: String,
    pub value: Value,
}

/// The final output of a compile: SQL text plus its parameters in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCommand {
    pub command_text: String,
    pub parameters: Vec<CommandParameter>,
}

impl SqlCommand {
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

impl std::fmt::Display for SqlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_text)?;
        for parameter in &self.parameters {
            write!(f, "\n  {} = {}", parameter.name, parameter.value)?;
        }
        Ok(())
    }
}

/// Accumulates text and parameters for one top-level compile. Nested
/// statements append to the same builder, so parameter numbering never
/// restarts inside a sub-query.
pub struct CommandBuilder<'g> {
    text: String,
    parameters: Vec<CommandParameter>,
    generator: &'g dyn SqlGenerator,
    native_boolean: bool,
}

impl<'g> CommandBuilder<'g> {
    pub fn new(generator: &'g dyn SqlGenerator) -> Self {
        Self {
            text: String::new(),
            parameters: Vec::new(),
            generator,
            native_boolean: generator.native_boolean(),
        }
    }

    /// Overrides the generator's boolean capability.
    pub fn with_native_boolean(mut self, native_boolean: bool) -> Self {
        self.native_boolean = native_boolean;
        self
    }

    pub fn generator(&self) -> &'g dyn SqlGenerator {
        self.generator
    }

    /// Whether bare boolean values are accepted in predicate positions.
    pub fn native_boolean(&self) -> bool {
        self.native_boolean
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn append_identifier(&mut self, name: &str) {
        let quoted = self.generator.quote_identifier(name);
        self.text.push_str(&quoted);
    }

    /// Adds `value` as the next parameter and appends its name.
    pub fn append_parameter(&mut self, value: Value) -> String {
        let name = self.generator.placeholder(self.parameters.len() + 1);
        self.text.push_str(&name);
        self.parameters.push(CommandParameter {
            name: name.clone(),
            value,
        });
        name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn build(self) -> SqlCommand {
        SqlCommand {
            command_text: self.text,
            parameters: self.parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::traits::SqlServerGenerator;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parameters_are_numbered_in_order() {
        let generator = SqlServerGenerator;
        let mut builder = CommandBuilder::new(&generator);
        builder.append("SELECT ");
        assert_eq!(builder.append_parameter(Value::from("a")), "@1");
        builder.append(", ");
        assert_eq!(builder.append_parameter(Value::Int(2)), "@2");

        let command = builder.build();
        assert_eq!(command.command_text, "SELECT @1, @2");
        assert_eq!(command.parameter("@2"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_native_boolean_defaults_to_generator() {
        let generator = SqlServerGenerator;
        assert!(!CommandBuilder::new(&generator).native_boolean());
        assert!(CommandBuilder::new(&generator).with_native_boolean(true).native_boolean());
    }
}
