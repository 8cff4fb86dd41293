/// The join table of an implicit many-to-many relation.
///
/// The table is named `_{Lower}To{Higher}` after the two model names ordered
/// ASCII case-insensitively. Column `A` references the lower model and `B`
/// the higher one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pivot {
    pub table: String,
    lower: String,
    higher: String,
}

impl Pivot {
    pub fn new(model: &str, related: &str) -> Pivot {
        let (lower, higher) = if model.to_ascii_lowercase() <= related.to_ascii_lowercase() {
            (model, related)
        } else {
            (related, model)
        };

        Pivot {
            table: format!("_{}To{}", ucfirst(lower), ucfirst(higher)),
            lower: lower.to_string(),
            higher: higher.to_string(),
        }
    }

    /// Column referencing `model`. A self relation uses `A` for the near side.
    pub fn column_for(&self, model: &str) -> &'static str {
        if model.eq_ignore_ascii_case(&self.lower) {
            "A"
        } else {
            "B"
        }
    }

    /// Column referencing the model on the other side of `model`.
    pub fn other_column(&self, model: &str) -> &'static str {
        match self.column_for(model) {
            "A" => "B",
            _ => "A",
        }
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn higher(&self) -> &str {
        &self.higher
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
