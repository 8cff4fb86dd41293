use super::Value;

/// A SQL fragment made of literal text and named bind parameters.
///
/// Binds keep their value next to their name; the dialect serializer turns
/// the names into positional placeholders and collects the values in order.
/// `Display` shows the named form (`:name`), which is what gets logged.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sql {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Bind(Bind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub name: String,
    pub value: Value,
}

impl Sql {
    pub fn new() -> Sql {
        Sql::default()
    }

    /// A fragment with no parameters.
    pub fn raw(text: impl Into<String>) -> Sql {
        let mut sql = Sql::new();
        sql.push_str(text.into());
        sql
    }

    pub fn bind(bind: Bind) -> Sql {
        Sql {
            parts: vec![Part::Bind(bind)],
        }
    }

    pub fn push_str(&mut self, text: impl AsRef<str>) -> &mut Sql {
        let text = text.as_ref();
        if text.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(Part::Text(last)) => last.push_str(text),
            _ => self.parts.push(Part::Text(text.to_string())),
        }
        self
    }

    pub fn push_bind(&mut self, bind: Bind) -> &mut Sql {
        self.parts.push(Part::Bind(bind));
        self
    }

    pub fn push_sql(&mut self, other: Sql) -> &mut Sql {
        for part in other.parts {
            match part {
                Part::Text(text) => {
                    self.push_str(text);
                }
                Part::Bind(bind) => {
                    self.push_bind(bind);
                }
            }
        }
        self
    }

    /// Joins fragments with a separator.
    pub fn join(fragments: impl IntoIterator<Item = Sql>, separator: &str) -> Sql {
        let mut out = Sql::new();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.push_sql(fragment);
        }
        out
    }

    /// Wraps the fragment in parentheses.
    pub fn parenthesized(self) -> Sql {
        let mut out = Sql::raw("(");
        out.push_sql(self);
        out.push_str(")");
        out
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn binds(&self) -> impl Iterator<Item = &Bind> + '_ {
        self.parts.iter().filter_map(|part| match part {
            Part::Bind(bind) => Some(bind),
            Part::Text(_) => None,
        })
    }
}

impl core::fmt::Display for Sql {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for part in &self.parts {
            match part {
                Part::Text(text) => f.write_str(text)?,
                Part::Bind(bind) => write!(f, ":{}", bind.name)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Sql {
    fn from(src: &str) -> Sql {
        Sql::raw(src)
    }
}

impl From<String> for Sql {
    fn from(src: String) -> Sql {
        Sql::raw(src)
    }
}
