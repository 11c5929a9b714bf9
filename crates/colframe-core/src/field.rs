//! `Field`/`Schema` metadata (spec §3).

use colframe_error::{ColframeError, ColframeResult};
use compact_str::CompactString;

use crate::dtype::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: CompactString,
    dtype: DataType,
    nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<CompactString>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable: true,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }
}

/// An ordered, name-unique list of [`Field`]s. Field order is positional;
/// callers must not assume alphabetical order (spec §3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn try_from_fields(fields: Vec<Field>) -> ColframeResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(fields.len());
        for f in &fields {
            if !seen.insert(f.name()) {
                return Err(ColframeError::DuplicateColumnName(f.name().to_string()));
            }
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn get_at(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dtype::DataType;

    #[test]
    fn rejects_duplicate_names() {
        let fields = vec![
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::String),
        ];
        assert!(matches!(
            Schema::try_from_fields(fields),
            Err(ColframeError::DuplicateColumnName(_))
        ));
    }

    #[test]
    fn lookup_by_name() {
        let schema = Schema::try_from_fields(vec![
            Field::new("a", DataType::Int64),
            Field::new("b", DataType::String),
        ])
        .unwrap();
        assert_eq!(schema.index_of("b"), Some(1));
        assert_eq!(schema.index_of("z"), None);
    }
}
