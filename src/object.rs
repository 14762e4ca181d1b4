use std::fmt::Display;

use crate::interner::Interner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    String(ObjString),
}

/// Handle to an interned string owned by an [`Interner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjString(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    String,
}

impl Object {
    /// Copies a borrowed view (e.g. a lexeme) into the heap.
    pub fn copy_string(contents: &str, interner: &mut Interner) -> Self {
        Self::String(interner.intern(contents))
    }

    /// Moves an already allocated buffer into the heap without copying its bytes.
    pub fn take_string(string: String, interner: &mut Interner) -> Self {
        Self::String(interner.intern_owned(string))
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::String(_) => ObjectKind::String,
        }
    }

    pub fn as_string(&self) -> Option<ObjString> {
        match *self {
            Object::String(s) => Some(s),
        }
    }
}

impl Display for ObjString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<string {}>", self.0)
    }
}
