/// Collects field rule violations in the order the rules are declared.
///
/// Messages take the form `"<field>: <problem>"` so they can be shown next to
/// the record's display name without further formatting.
#[derive(Debug, Default)]
pub struct Rules {
    errors: Vec<String>,
}

impl Rules {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// The value must contain something other than whitespace
    pub fn not_empty(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{}: required", field));
        }
        self
    }

    /// The value must not be negative (zero is the blank-record default)
    pub fn positive<T: Into<f64>>(mut self, field: &str, value: T) -> Self {
        let value = value.into();
        if value.is_nan() || value < 0.0 {
            self.errors.push(format!("{}: must not be negative", field));
        }
        self
    }

    pub fn finish(self) -> Vec<String> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_keep_declaration_order() {
        let errors = Rules::new()
            .positive("cost", -1.5)
            .not_empty("name", "")
            .not_empty("source", "  ")
            .positive("duration", 0)
            .finish();

        assert_eq!(
            errors,
            vec![
                "cost: must not be negative".to_string(),
                "name: required".to_string(),
                "source: required".to_string(),
            ]
        );
    }

    #[test]
    fn test_nan_is_not_positive() {
        assert_eq!(Rules::new().positive("cost", f64::NAN).finish().len(), 1);
    }
}
