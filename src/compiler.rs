/// Most locals that can be live at once; slots are addressed by a single byte.
pub const LOCALS_MAX: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Local<'source> {
    pub name: &'source str,
    /// `None` until the initializer has been compiled.
    pub depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSlot {
    pub index: u8,
    pub initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    TooManyLocals,
    AlreadyDeclared,
}

/// Lexical scope bookkeeping for the code being compiled.
///
/// A local's position in `locals` is its stack slot at run time.
#[derive(Debug, Default)]
pub struct Compiler<'source> {
    locals: Vec<Local<'source>>,
    scope_depth: usize,
}

impl<'source> Compiler<'source> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope_depth(&self) -> usize {
        self.scope_depth
    }

    pub fn is_global_scope(&self) -> bool {
        self.scope_depth == 0
    }

    pub fn locals(&self) -> &[Local<'source>] {
        &self.locals
    }

    pub fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Leaves the current scope and returns how many locals went out of scope.
    pub fn end_scope(&mut self) -> usize {
        self.scope_depth = self.scope_depth.saturating_sub(1);
        let mut popped = 0;
        while let Some(local) = self.locals.last() {
            if local.depth.map_or(false, |depth| depth <= self.scope_depth) {
                break;
            }
            self.locals.pop();
            popped += 1;
        }
        popped
    }

    /// Declares an uninitialized local in the current scope.
    pub fn declare_local(&mut self, name: &'source str) -> Result<(), ScopeError> {
        for local in self.locals.iter().rev() {
            if let Some(depth) = local.depth {
                if depth < self.scope_depth {
                    break;
                }
            }
            if local.name == name {
                return Err(ScopeError::AlreadyDeclared);
            }
        }

        if self.locals.len() == LOCALS_MAX {
            return Err(ScopeError::TooManyLocals);
        }
        self.locals.push(Local { name, depth: None });
        Ok(())
    }

    pub fn mark_initialized(&mut self) {
        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    /// Looks a name up innermost scope first. `None` means it is not a local.
    ///
    /// A local still being initialized shadows nothing: an enclosing local of
    /// the same name is found instead. Only when there is none is the
    /// uninitialized slot returned.
    pub fn resolve_local(&self, name: &str) -> Option<LocalSlot> {
        let mut pending = None;
        for (index, local) in self.locals.iter().enumerate().rev() {
            if local.name != name {
                continue;
            }
            let slot = LocalSlot {
                index: index as u8,
                initialized: local.depth.is_some(),
            };
            if slot.initialized {
                return Some(slot);
            }
            pending.get_or_insert(slot);
        }
        pending
    }
}
