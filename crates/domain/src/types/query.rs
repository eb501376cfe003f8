//! List query value objects: ordering, filtering, field selection, limit

use serde_json::{Map, Value};

use crate::constants::{PARAM_FILTER, PARAM_ORDER, PARAM_SELECT, PARAM_START};
use crate::impl_wire_enum_conversions;
use crate::types::command::Params;

/// Sort direction of one ordering field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl_wire_enum_conversions!(Direction {
    Asc => "ASC",
    Desc => "DESC",
});

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Whether this is `ASC`.
    pub fn is_ascending(self) -> bool {
        matches!(self, Self::Asc)
    }
}

/// Comparison operators the engine itself puts into filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl FilterOp {
    fn prefix(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Filter key for `field`, e.g. `>ID`.
    pub fn key(self, field: &str) -> String {
        format!("{}{field}", self.prefix())
    }
}

/// Ordered list of `field -> direction` pairs. Earlier fields sort first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderSpec(Vec<(String, Direction)>);

impl OrderSpec {
    /// Empty ordering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `field` unless it is already ordered on.
    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        let field = field.into();
        if self.direction_of(&field).is_none() {
            self.0.push((field, direction));
        }
        self
    }

    /// Whether no sort key was given.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort keys in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.0.iter().map(|(field, direction)| (field.as_str(), *direction))
    }

    /// Direction requested for `field`.
    pub fn direction_of(&self, field: &str) -> Option<Direction> {
        self.0.iter().find(|(name, _)| name.eq_ignore_ascii_case(field)).map(|(_, dir)| *dir)
    }

    /// Ordering with the identifier present; ascending when it was absent.
    pub fn with_identifier(self, id_field: &str) -> Self {
        self.then(id_field, Direction::Asc)
    }

    /// Every direction flipped; used by the reverse boundary probe.
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().map(|(field, dir)| (field.clone(), dir.reversed())).collect())
    }

    /// Wire form: an object of field to `ASC`/`DESC`.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(field, dir)| (field.clone(), Value::String(dir.to_string())))
            .collect();
        Value::Object(map)
    }
}

/// Filter predicates keyed by `<operator><field>` (`>ID`, `!STAGE_ID`, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSpec(Map<String, Value>);

const OPERATOR_CHARS: &[char] = &['=', '!', '<', '>', '%', '@'];

impl FilterSpec {
    /// Empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; `key` may carry an operator prefix such as `>`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Copy of this filter with the engine-owned predicates added.
    pub fn merged_with<I>(&self, predicates: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut merged = self.0.clone();
        merged.extend(predicates);
        Self(merged)
    }

    /// Whether no predicate was given.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any predicate constrains `field`, whatever its operator.
    pub fn constrains(&self, field: &str) -> bool {
        self.0.keys().any(|key| key.trim_start_matches(OPERATOR_CHARS).eq_ignore_ascii_case(field))
    }

    /// Predicates keyed by operator and field.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Wire form of the predicates.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for FilterSpec {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Caller-side description of one list traversal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListQuery {
    /// Sort specification.
    pub order: OrderSpec,
    /// Caller predicates.
    pub filter: FilterSpec,
    /// Fields to return; empty means the method default.
    pub select: Vec<String>,
    /// Maximum number of rows to yield.
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Start building a query.
    pub fn builder() -> ListQueryBuilder {
        ListQueryBuilder::default()
    }

    /// Whether `field` will be present in returned rows.
    ///
    /// An empty selection returns the method's default field set, which always
    /// carries the identifier.
    pub fn selects(&self, field: &str) -> bool {
        self.select.is_empty()
            || self.select.iter().any(|name| name == "*" || name.eq_ignore_ascii_case(field))
    }
}

/// Builder for [`ListQuery`].
#[derive(Debug, Default)]
pub struct ListQueryBuilder {
    query: ListQuery,
}

impl ListQueryBuilder {
    /// Append a sort key.
    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.query.order = self.query.order.then(field, direction);
        self
    }

    /// Add a filter predicate.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.filter = self.query.filter.with(key, value);
        self
    }

    /// Fields to return.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.select.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Stop after `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Finish the query.
    pub fn build(self) -> ListQuery {
        self.query
    }
}

/// Parameter map of one list call.
pub fn list_params(order: &OrderSpec, filter: &FilterSpec, select: &[String], start: i64) -> Params {
    let mut params = Params::new();
    if !order.is_empty() {
        params.insert(PARAM_ORDER.into(), order.to_value());
    }
    if !filter.is_empty() {
        params.insert(PARAM_FILTER.into(), filter.to_value());
    }
    if !select.is_empty() {
        params.insert(
            PARAM_SELECT.into(),
            Value::Array(select.iter().cloned().map(Value::String).collect()),
        );
    }
    params.insert(PARAM_START.into(), Value::from(start));
    params
}
