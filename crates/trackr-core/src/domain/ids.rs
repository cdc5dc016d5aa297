//! Domain identifiers (strongly-typed IDs).
//!
//! # 文字列ベースの ID + Phantom type
//! 新規に採番する ID は ULID（時刻でソート可能）ですが、外部から届く ID
//! （キューの payload、URL パス、既存の DB 行）は任意の文字列なので、
//! 内部表現は `String` にしています。
//!
//! `Id<T>` の `T` は実行時には使わないマーカー型で、
//! `ReportId` と `ProjectId` をコンパイル時に区別するためだけに存在します。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// エラーメッセージやログで使う名前（例: "report"）
    fn name() -> &'static str;
}

/// ジェネリック ID 型
///
/// wire format は素の文字列（`"01HV..."`）で、serde も同じ形で読み書きします。
pub struct Id<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

/// 空文字列は ID として受け付けない
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} id must not be empty")]
pub struct EmptyIdError {
    kind: &'static str,
}

impl<T: IdMarker> Id<T> {
    /// 既存の文字列から Id を作成（検証なし）
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::new(ulid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

// derive だと `T: Clone` などを要求してしまうので手書きする
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::name(), self.value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = EmptyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmptyIdError { kind: T::name() });
        }
        Ok(Self::new(trimmed))
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

macro_rules! id_marker {
    ($marker:ident, $name:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $marker {}

        impl IdMarker for $marker {
            fn name() -> &'static str {
                $name
            }
        }
    };
}

id_marker!(Report, "report");
id_marker!(Project, "project");
id_marker!(User, "user");
id_marker!(Task, "task");

/// Identifier of a Report (one summary request).
pub type ReportId = Id<Report>;

/// Identifier of a Project.
pub type ProjectId = Id<Project>;

/// Identifier of a User.
pub type UserId = Id<User>;

/// Identifier of a Task inside a project.
pub type TaskId = Id<Task>;
