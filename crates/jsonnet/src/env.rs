//! Lexical environments: linked frames of variable bindings, plus the
//! `self`/`super`/`$` context that is itself resolved lexically (spec.md
//! §4.5 — closures capture whatever `self`/`super` were active at the
//! point a function or field body was written, not at the point it is
//! later called or forced).

use std::rc::Rc;

use ahash::AHashMap;

use crate::value::{ObjectValue, SuperView, Thunk};

#[derive(Debug)]
enum Frame {
    Vars(AHashMap<Rc<str>, Thunk>),
    Context { self_obj: Rc<ObjectValue>, super_view: Option<SuperView>, dollar: Rc<ObjectValue> },
}

#[derive(Debug)]
struct Node {
    frame: Frame,
    parent: Env,
}

/// A possibly-empty environment chain. Cheaply cloned (`Rc` bump) so every
/// thunk and closure can hold its own handle without copying bindings.
#[derive(Debug, Clone, Default)]
pub struct Env(Option<Rc<Node>>);

impl Env {
    pub fn root() -> Self {
        Self(None)
    }

    /// Pushes a single-variable binding frame. Used for function parameters
    /// and `local` bindings resolved one at a time.
    pub fn bind(&self, name: Rc<str>, value: Thunk) -> Self {
        let mut map = AHashMap::with_capacity(1);
        map.insert(name, value);
        Self(Some(Rc::new(Node { frame: Frame::Vars(map), parent: self.clone() })))
    }

    /// Pushes a frame with every binding in `vars` simultaneously visible —
    /// used for sibling `local` groups and function call frames, where each
    /// bound expression must see every sibling (recursive locals, mutual
    /// recursion between function bindings).
    pub fn bind_many(&self, vars: AHashMap<Rc<str>, Thunk>) -> Self {
        Self(Some(Rc::new(Node { frame: Frame::Vars(vars), parent: self.clone() })))
    }

    /// Pushes a new `self`/`super`/`$` context, as happens once per object
    /// literal instantiation. `dollar` is the outermost object's `self`,
    /// propagated unchanged unless this is itself the outermost object.
    pub fn bind_context(&self, self_obj: Rc<ObjectValue>, super_view: Option<SuperView>, dollar: Rc<ObjectValue>) -> Self {
        Self(Some(Rc::new(Node { frame: Frame::Context { self_obj, super_view, dollar }, parent: self.clone() })))
    }

    pub fn lookup(&self, name: &str) -> Option<Thunk> {
        let mut cur = &self.0;
        while let Some(node) = cur {
            if let Frame::Vars(vars) = &node.frame {
                if let Some(t) = vars.get(name) {
                    return Some(t.clone());
                }
            }
            cur = &node.parent.0;
        }
        None
    }

    pub fn self_obj(&self) -> Option<Rc<ObjectValue>> {
        let mut cur = &self.0;
        while let Some(node) = cur {
            if let Frame::Context { self_obj, .. } = &node.frame {
                return Some(self_obj.clone());
            }
            cur = &node.parent.0;
        }
        None
    }

    pub fn super_view(&self) -> Option<SuperView> {
        let mut cur = &self.0;
        while let Some(node) = cur {
            if let Frame::Context { super_view, .. } = &node.frame {
                return super_view.clone();
            }
            cur = &node.parent.0;
        }
        None
    }

    pub fn dollar(&self) -> Option<Rc<ObjectValue>> {
        let mut cur = &self.0;
        while let Some(node) = cur {
            if let Frame::Context { dollar, .. } = &node.frame {
                return Some(dollar.clone());
            }
            cur = &node.parent.0;
        }
        None
    }
}
