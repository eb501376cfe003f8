//! In-memory provider simulator implementing `GroupedTransport`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crmbatch_core::{ErrorMode, GroupedTransport};
use crmbatch_domain::utils::parse_id;
use crmbatch_domain::{
    Command, CommandId, CommandOutcome, CommandResponse, CrmError, GroupedEntry, GroupedResponse,
    Pagination, Params, RemoteFailure, Result as DomainResult,
};
use serde_json::{json, Map, Value};

/// One physical call seen by the backend.
#[derive(Debug, Clone)]
pub enum Call {
    Direct { method: String, params: Params },
    Grouped { commands: Vec<Command>, halt: bool },
}

impl Call {
    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped { .. })
    }

    pub fn command_count(&self) -> usize {
        match self {
            Self::Direct { .. } => 0,
            Self::Grouped { commands, .. } => commands.len(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<i64, Map<String, Value>>,
    calls: Vec<Call>,
}

/// Fake CRM portal holding one entity collection.
#[derive(Clone)]
pub struct FakeCrm {
    state: Arc<Mutex<State>>,
    page_size: usize,
    batch_limit: usize,
    id_field: String,
    rows_key: Option<String>,
    string_ids: bool,
    failing_commands: HashSet<String>,
    failing_ids: HashSet<i64>,
    failing_grouped_calls: HashSet<usize>,
}

impl FakeCrm {
    /// Collection with the given ids, provider limits 50/50, `ID` rendered as
    /// a string the way the real API does.
    pub fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let crm = Self {
            state: Arc::new(Mutex::new(State::default())),
            page_size: 50,
            batch_limit: 50,
            id_field: "ID".into(),
            rows_key: None,
            string_ids: true,
            failing_commands: HashSet::new(),
            failing_ids: HashSet::new(),
            failing_grouped_calls: HashSet::new(),
        };
        crm.insert(ids);
        crm
    }

    /// Item-style collection: lower-case integer `id`, rows under `items`.
    pub fn items(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut crm = Self::with_ids(std::iter::empty());
        crm.id_field = "id".into();
        crm.rows_key = Some("items".into());
        crm.string_ids = false;
        crm.insert(ids);
        crm
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Every command with this id fails inside grouped calls.
    pub fn failing_command(mut self, command_id: &str) -> Self {
        self.failing_commands.insert(command_id.to_string());
        self
    }

    /// Writes targeting `id` fail.
    pub fn failing_id(mut self, id: i64) -> Self {
        self.failing_ids.insert(id);
        self
    }

    /// The `n`-th grouped call (0-based) fails at transport level.
    pub fn failing_grouped_call(mut self, n: usize) -> Self {
        self.failing_grouped_calls.insert(n);
        self
    }

    pub fn insert(&self, ids: impl IntoIterator<Item = i64>) {
        let mut state = self.state.lock().unwrap();
        for id in ids {
            let mut row = Map::new();
            let id_value = if self.string_ids { json!(id.to_string()) } else { json!(id) };
            row.insert(self.id_field.clone(), id_value);
            row.insert("TITLE".into(), json!(format!("Deal #{id}")));
            row.insert("CATEGORY_ID".into(), json!((id % 3).to_string()));
            state.rows.insert(id, row);
        }
    }

    pub fn remove(&self, ids: impl IntoIterator<Item = i64>) {
        let mut state = self.state.lock().unwrap();
        for id in ids {
            state.rows.remove(&id);
        }
    }

    pub fn stored_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().rows.keys().copied().collect()
    }

    pub fn row(&self, id: i64) -> Option<Value> {
        self.state.lock().unwrap().rows.get(&id).cloned().map(Value::Object)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn direct_calls(&self) -> usize {
        self.calls().iter().filter(|call| !call.is_grouped()).count()
    }

    pub fn grouped_calls(&self) -> usize {
        self.calls().iter().filter(|call| call.is_grouped()).count()
    }

    /// Commands of every grouped call, in order.
    pub fn grouped_commands(&self) -> Vec<Command> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Grouped { commands, .. } => Some(commands),
                Call::Direct { .. } => None,
            })
            .flatten()
            .collect()
    }

    pub fn into_transport(self) -> Arc<dyn GroupedTransport> {
        Arc::new(self)
    }

    fn dispatch(&self, state: &mut State, method: &str, params: &Params) -> Result<CommandResponse, RemoteFailure> {
        if method.ends_with(".list") {
            Ok(self.list(state, params))
        } else if method.ends_with(".delete") {
            let id = self.write_target(params)?;
            state.rows.remove(&id).ok_or_else(not_found)?;
            Ok(CommandResponse::new(json!(true)))
        } else if method.ends_with(".update") {
            let id = self.write_target(params)?;
            let row = state.rows.get_mut(&id).ok_or_else(not_found)?;
            if let Some(Value::Object(fields)) = params.get("fields") {
                row.extend(fields.clone());
            }
            Ok(CommandResponse::new(json!(true)))
        } else if method == "server.time" {
            Ok(CommandResponse::new(json!("2024-01-01T00:00:00+00:00")))
        } else {
            Err(RemoteFailure::new("ERROR_METHOD_NOT_FOUND", format!("Method not found: {method}")))
        }
    }

    fn write_target(&self, params: &Params) -> Result<i64, RemoteFailure> {
        let id = params
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| RemoteFailure::new("INVALID_ARG_VALUE", "id is required"))?;
        if self.failing_ids.contains(&id) {
            return Err(RemoteFailure::new("ACCESS_DENIED", format!("cannot modify {id}")));
        }
        Ok(id)
    }

    fn list(&self, state: &State, params: &Params) -> CommandResponse {
        let ascending = params
            .get("order")
            .and_then(|order| order.as_object())
            .and_then(|order| {
                order.iter().find(|(field, _)| field.eq_ignore_ascii_case(&self.id_field))
            })
            .map_or(true, |(_, dir)| !dir.as_str().unwrap_or("ASC").eq_ignore_ascii_case("DESC"));

        let filter = params.get("filter").and_then(Value::as_object).cloned().unwrap_or_default();
        let mut matching: Vec<(&i64, &Map<String, Value>)> =
            state.rows.iter().filter(|(id, row)| self.matches(**id, row, &filter)).collect();
        if !ascending {
            matching.reverse();
        }

        let start = params.get("start").and_then(Value::as_i64).unwrap_or(0);
        let offset = usize::try_from(start.max(0)).unwrap_or(0);
        let select: Vec<&str> = params
            .get("select")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let page: Vec<Value> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|(_, row)| Value::Object(project(row, &select)))
            .collect();

        let pagination = if start >= 0 {
            let total = matching.len();
            let next = (offset + self.page_size < total).then(|| (offset + self.page_size) as u64);
            Pagination { total: Some(total as u64), next }
        } else {
            Pagination::default()
        };

        let result = match &self.rows_key {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), Value::Array(page));
                Value::Object(wrapped)
            }
            None => Value::Array(page),
        };
        CommandResponse::new(result).with_pagination(pagination)
    }

    fn matches(&self, id: i64, row: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
        filter.iter().all(|(key, expected)| {
            let field = key.trim_start_matches(['>', '<', '=', '!']);
            let op = &key[..key.len() - field.len()];

            if field.eq_ignore_ascii_case(&self.id_field) {
                let Some(bound) = parse_id(expected) else { return false };
                return match op {
                    ">" => id > bound,
                    ">=" => id >= bound,
                    "<" => id < bound,
                    "<=" => id <= bound,
                    "!" | "!=" => id != bound,
                    _ => id == bound,
                };
            }

            let actual = row.get(field).map(scalar_text).unwrap_or_default();
            match op {
                "!" | "!=" => actual != scalar_text(expected),
                _ => actual == scalar_text(expected),
            }
        })
    }

    fn resolve(&self, value: &Value, results: &HashMap<String, Value>) -> Option<Value> {
        match value {
            Value::String(text) if text.starts_with("$result[") => resolve_path(text, results),
            Value::Object(map) => {
                let mut resolved = Map::new();
                for (key, inner) in map {
                    resolved.insert(key.clone(), self.resolve(inner, results)?);
                }
                Some(Value::Object(resolved))
            }
            other => Some(other.clone()),
        }
    }
}

fn not_found() -> RemoteFailure {
    RemoteFailure::new("NOT_FOUND", "Not found")
}

fn project(row: &Map<String, Value>, select: &[&str]) -> Map<String, Value> {
    if select.is_empty() || select.contains(&"*") {
        return row.clone();
    }
    row.iter()
        .filter(|(field, _)| select.iter().any(|name| name.eq_ignore_ascii_case(field)))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Resolve `$result[cmd][seg]...` against earlier results; `None` when the
/// path leads nowhere.
fn resolve_path(expr: &str, results: &HashMap<String, Value>) -> Option<Value> {
    let inner = expr.strip_prefix("$result[")?.strip_suffix(']')?;
    let mut segments = inner.split("][");
    let mut current = results.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

#[async_trait]
impl GroupedTransport for FakeCrm {
    async fn call(&self, method: &str, params: &Params) -> DomainResult<CommandResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Direct { method: method.to_string(), params: params.clone() });
        self.dispatch(&mut state, method, params)
            .map_err(|failure| CrmError::remote(method, failure.to_string()))
    }

    async fn execute(&self, commands: &[Command], mode: ErrorMode) -> DomainResult<GroupedResponse> {
        let mut state = self.state.lock().unwrap();
        let call_index = state.calls.iter().filter(|call| call.is_grouped()).count();
        state.calls.push(Call::Grouped { commands: commands.to_vec(), halt: mode.halts() });

        if self.failing_grouped_calls.contains(&call_index) {
            return Err(CrmError::remote("batch", "connection reset by peer"));
        }
        if commands.len() > self.batch_limit {
            return Err(CrmError::remote(
                "batch",
                format!("Max batch length exceeded: {} > {}", commands.len(), self.batch_limit),
            ));
        }

        let mut results: HashMap<String, Value> = HashMap::new();
        let mut entries = Vec::with_capacity(commands.len());
        let mut halted = false;

        for command in commands {
            let id: &CommandId = command.id();
            if halted {
                entries.push(GroupedEntry { command_id: id.clone(), outcome: CommandOutcome::NotExecuted });
                continue;
            }

            let outcome = if self.failing_commands.contains(id.as_str()) {
                Err(RemoteFailure::new("INTERNAL_SERVER_ERROR", "injected failure"))
            } else {
                match self.resolve(&Value::Object(command.params().clone()), &results) {
                    Some(Value::Object(params)) => self.dispatch(&mut state, command.method(), &params),
                    _ => Err(RemoteFailure::new("INVALID_ARG_VALUE", "unresolved result reference")),
                }
            };

            match outcome {
                Ok(response) => {
                    results.insert(id.as_str().to_string(), response.result.clone());
                    entries.push(GroupedEntry { command_id: id.clone(), outcome: CommandOutcome::Completed(response) });
                }
                Err(failure) => {
                    halted = mode.halts();
                    entries.push(GroupedEntry { command_id: id.clone(), outcome: CommandOutcome::Failed(failure) });
                }
            }
        }

        Ok(GroupedResponse::new(entries))
    }
}
