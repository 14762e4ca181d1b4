use ahash::AHashMap;

use typed_arena::Arena;

use crate::object::ObjString;

/// Registry of every heap string allocated during a session.
///
/// Strings live in the arena until the arena itself is dropped; nothing is
/// collected in between. Equal contents always map to the same handle.
pub struct Interner<'heap> {
    map: AHashMap<&'heap str, ObjString>,
    vec: Vec<StringEntry<'heap>>,
    arena: &'heap Arena<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct StringEntry<'heap> {
    pub chars: &'heap str,
    pub hash: u32,
}

impl<'heap> Interner<'heap> {
    pub fn new(arena: &'heap Arena<String>) -> Interner<'heap> {
        Interner {
            map: AHashMap::new(),
            vec: Vec::new(),
            arena,
        }
    }

    /// Interns a borrowed string, copying it into the arena if it is new.
    pub fn intern(&mut self, name: &str) -> ObjString {
        if let Some(&idx) = self.map.get(name) {
            return idx;
        }
        let chars: &'heap str = self.arena.alloc(name.to_owned());
        self.insert(chars)
    }

    /// Interns an owned string. The buffer moves into the arena as is.
    pub fn intern_owned(&mut self, name: String) -> ObjString {
        if let Some(&idx) = self.map.get(name.as_str()) {
            return idx;
        }
        let chars: &'heap str = self.arena.alloc(name);
        self.insert(chars)
    }

    fn insert(&mut self, chars: &'heap str) -> ObjString {
        let idx = ObjString(self.vec.len() as u32);
        self.map.insert(chars, idx);
        self.vec.push(StringEntry {
            chars,
            hash: hash_string(chars),
        });

        debug_assert!(self.lookup(idx) == Some(chars));

        idx
    }

    pub fn exists(&self, string: &str) -> bool {
        self.map.contains_key(string)
    }

    pub fn lookup(&self, idx: ObjString) -> Option<&'heap str> {
        self.vec.get(idx.0 as usize).map(|entry| entry.chars)
    }

    pub fn hash(&self, idx: ObjString) -> Option<u32> {
        self.vec.get(idx.0 as usize).map(|entry| entry.hash)
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Every allocated string, oldest first.
    pub fn objects(&self) -> impl Iterator<Item = (ObjString, &StringEntry<'heap>)> + '_ {
        self.vec
            .iter()
            .enumerate()
            .map(|(idx, entry)| (ObjString(idx as u32), entry))
    }
}

/// 32-bit FNV-1a.
pub fn hash_string(chars: &str) -> u32 {
    chars.bytes().fold(2_166_136_261u32, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(16_777_619)
    })
}
