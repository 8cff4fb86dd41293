use quarry_core::stmt;

/// Collects bind values in the order their placeholders are written.
pub trait Params {
    fn push(&mut self, param: &stmt::Value) -> Placeholder;
}

/// One-based position of a parameter.
pub struct Placeholder(pub usize);

impl Params for Vec<stmt::Value> {
    fn push(&mut self, value: &stmt::Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}
