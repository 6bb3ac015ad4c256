//! 表格载荷：把后端 `dataframe` 字段（字符串里再套一层 JSON）解码为 TabularData
//!
//! 支持的形状：
//! - `{"columns": [...], "rows": [[...]]}` / `{"columns": [...], "data": [[...]]}`
//! - records：`[{"col": v}, ...]`，列顺序按键首次出现的顺序，缺失值为 null
//! - 列表列：`{"col": [v, ...]}`，各列长度必须一致
//! - 索引列：`{"col": {"0": v, ...}}`，行按索引首次出现的顺序，缺失值为 null

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::core::ChatError;

/// 单元格标量；嵌套数组 / 对象按其 JSON 文本保存
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(b),
            Value::Number(n) => Scalar::Number(n),
            Value::String(s) => Scalar::Text(s),
            nested => Scalar::Text(nested.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// 表格：每一行的长度都等于列数
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TabularData {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

fn decode_err(msg: impl Into<String>) -> ChatError {
    ChatError::Decode(msg.into())
}

fn column_name(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl TabularData {
    /// 构造并校验行宽
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, ChatError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(decode_err(format!(
                "row {} has {} cells, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 解码字符串形式的表格
    pub fn decode(serialized: &str) -> Result<Self, ChatError> {
        let value: Value =
            serde_json::from_str(serialized).map_err(|e| decode_err(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ChatError> {
        match value {
            Value::Array(records) => Self::from_records(records),
            Value::Object(mut map) => {
                let is_split = matches!(map.get("columns"), Some(Value::Array(_)))
                    && (map.contains_key("rows") || map.contains_key("data"));
                if !is_split {
                    // 没有 columns 时 rows / data 只是普通列名
                    return Self::from_columns(map);
                }
                let body = map
                    .remove("rows")
                    .or_else(|| map.remove("data"))
                    .unwrap_or(Value::Null);
                let columns = match map.remove("columns") {
                    Some(Value::Array(cols)) => cols,
                    _ => Vec::new(),
                };
                Self::from_split(columns, body)
            }
            other => Err(decode_err(format!("unsupported table shape: {}", other))),
        }
    }

    fn from_split(columns: Vec<Value>, body: Value) -> Result<Self, ChatError> {
        let columns: Vec<String> = columns.into_iter().map(column_name).collect();
        let Value::Array(rows) = body else {
            return Err(decode_err("table rows must be an array"));
        };
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Array(cells) => Ok(cells.into_iter().map(Scalar::from).collect()),
                other => Err(decode_err(format!("table row must be an array, got {}", other))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns, rows)
    }

    fn from_records(records: Vec<Value>) -> Result<Self, ChatError> {
        let mut objects = Vec::with_capacity(records.len());
        for record in records {
            match record {
                Value::Object(obj) => objects.push(obj),
                other => {
                    return Err(decode_err(format!("record must be an object, got {}", other)))
                }
            }
        }

        let mut columns: Vec<String> = Vec::new();
        for obj in &objects {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .into_iter()
            .map(|mut obj| {
                columns
                    .iter()
                    .map(|c| obj.remove(c).map(Scalar::from).unwrap_or(Scalar::Null))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    fn from_columns(map: Map<String, Value>) -> Result<Self, ChatError> {
        if map.is_empty() {
            return Self::new(Vec::new(), Vec::new());
        }
        if map.values().all(|v| matches!(v, Value::Array(_))) {
            return Self::from_column_lists(map);
        }
        if map.values().all(|v| matches!(v, Value::Object(_))) {
            return Self::from_column_indexes(map);
        }
        Err(decode_err(
            "column-oriented table needs every column to be a list or an index map",
        ))
    }

    fn from_column_lists(map: Map<String, Value>) -> Result<Self, ChatError> {
        let mut columns = Vec::with_capacity(map.len());
        let mut cells: Vec<Vec<Value>> = Vec::with_capacity(map.len());
        for (name, value) in map {
            if let Value::Array(values) = value {
                columns.push(name);
                cells.push(values);
            }
        }
        let height = cells.first().map(Vec::len).unwrap_or(0);
        if cells.iter().any(|c| c.len() != height) {
            return Err(decode_err("all columns must have the same length"));
        }

        let mut iters: Vec<_> = cells.into_iter().map(Vec::into_iter).collect();
        let rows = (0..height)
            .map(|_| {
                iters
                    .iter_mut()
                    .map(|it| it.next().map(Scalar::from).unwrap_or(Scalar::Null))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    fn from_column_indexes(map: Map<String, Value>) -> Result<Self, ChatError> {
        let mut columns = Vec::with_capacity(map.len());
        let mut indexed: Vec<Map<String, Value>> = Vec::with_capacity(map.len());
        for (name, value) in map {
            if let Value::Object(by_index) = value {
                columns.push(name);
                indexed.push(by_index);
            }
        }

        let mut index: Vec<String> = Vec::new();
        for col in &indexed {
            for key in col.keys() {
                if !index.contains(key) {
                    index.push(key.clone());
                }
            }
        }

        let rows = index
            .iter()
            .map(|key| {
                indexed
                    .iter_mut()
                    .map(|col| col.remove(key).map(Scalar::from).unwrap_or(Scalar::Null))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }
}
