//! Example crate demonstrating tsgen-codegen usage.
//!
//! This crate defines the JSON payloads of a small directory service and
//! generates TypeScript declarations for them.
//!
//! The `#[derive(TypeScript)]` macro is a no-op annotation that marks the
//! roots. The actual generation happens in build.rs using
//! `TypeScriptGenerator`, which also picks up every type the roots reach.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tsgen_codegen::TypeScript;
use tsgen_codegen::collections::Set;
use uuid::Uuid;

/// A simple 2D point.
#[derive(Serialize, Deserialize, TypeScript, Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, TypeScript, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
    ReadOnly,
}

/// An ordered set of labels. Serialized as a JSON array.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Tags<T: Ord>(pub BTreeSet<T>);

impl<T: Ord> Set<T> for Tags<T> {}

#[derive(Serialize, Deserialize, TypeScript, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub display_name: String,
    pub age: u32,
    pub email: Option<String>,
    pub role: Role,
    pub scores: Vec<u32>,
    pub tags: Tags<String>,
    pub home: Option<Point>,
    #[serde(skip)]
    pub session: Option<String>,
}

/// Who created a record and when. Not annotated: generated because
/// [`Directory`] flattens it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Audit {
    pub created_at: u64,
    pub created_by: String,
}

/// One page of a listing.
#[derive(Serialize, Deserialize, TypeScript, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Serialize, Deserialize, TypeScript, Debug, Clone, PartialEq)]
pub struct Directory {
    #[serde(flatten)]
    pub audit: Audit,
    #[serde(flatten)]
    pub page: Page<Person>,
    pub landmarks: HashMap<String, Point>,
}
