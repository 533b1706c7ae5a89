use serde::Serialize;
use slotmap::new_key_type;
use std::fmt;
use std::marker::PhantomData;

/// Human readable name, typed by what it names so node and task names cannot be mixed up.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct Name<T> {
    pub id: String,
    _marker: PhantomData<T>,
}

impl<T> Name<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Name { id: id.into(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Display for Name<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Name<T>> for String {
    fn from(name: Name<T>) -> Self {
        name.id
    }
}

impl<T> From<&str> for Name<T> {
    fn from(id: &str) -> Self {
        Name::new(id)
    }
}

impl<T> fmt::Debug for Name<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Name");

        write!(f, "{}: {:?}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct NodeTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct TaskTag;

pub type NodeName = Name<NodeTag>;
pub type TaskName = Name<TaskTag>;

new_key_type! {
    /// Arena key of a node inside the topology.
    pub struct NodeId;

    /// Arena key of a directed link inside the topology.
    pub struct LinkId;
}

/// Caller supplied task identifier, unique within one run.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        TaskId(id)
    }
}
