//! Function call argument binding: matching positional/named arguments
//! against a parameter list and filling in lazy defaults, per spec.md
//! §4.4/§4.5.

use std::rc::Rc;

use ahash::AHashMap;

use crate::core::CoreParam;
use crate::env::Env;
use crate::error::Diagnostic;
use crate::span::Span;
use crate::value::Thunk;

/// Binds `args` (already lowered to thunks by the caller, in the order
/// they appeared at the call site, tagged with an optional name) against
/// `params`, returning the call-frame environment: `closure_env` extended
/// with one binding per parameter. Named arguments may appear in any
/// order; positional arguments fill parameters left-to-right. A parameter
/// with no supplied argument falls back to its default expression,
/// evaluated lazily in the call frame itself, so defaults may reference
/// any other parameter — supplied or itself defaulted — the same way
/// Jsonnet's reference semantics allow.
pub fn bind_args(
    params: &[CoreParam],
    args: &[(Option<Rc<str>>, Thunk)],
    closure_env: &Env,
    call_span: &Span,
) -> Result<Env, Diagnostic> {
    let mut bound: AHashMap<Rc<str>, Thunk> = AHashMap::with_capacity(params.len());
    let mut next_positional = 0usize;

    for (name, thunk) in args {
        match name {
            None => {
                let Some(param) = params.get(next_positional) else {
                    return Err(Diagnostic::runtime(
                        format!("too many positional arguments: expected at most {}", params.len()),
                        call_span.clone(),
                    ));
                };
                next_positional += 1;
                bound.insert(param.name.clone(), thunk.clone());
            }
            Some(name) => {
                if !params.iter().any(|p| &p.name == name) {
                    return Err(Diagnostic::runtime(format!("function has no parameter named \"{name}\""), call_span.clone()));
                }
                if bound.insert(name.clone(), thunk.clone()).is_some() {
                    return Err(Diagnostic::runtime(format!("parameter \"{name}\" bound more than once"), call_span.clone()));
                }
            }
        }
    }

    let missing: Vec<&str> = params.iter().filter(|p| !bound.contains_key(&p.name) && p.default.is_none()).map(|p| &*p.name).collect();
    if !missing.is_empty() {
        return Err(Diagnostic::runtime(format!("missing argument(s): {}", missing.join(", ")), call_span.clone()));
    }

    // Defaults are built against a throwaway environment first (the call
    // frame doesn't exist yet), then pointed at the real frame once it's
    // built, so a default can see any sibling parameter including itself.
    let mut placeholders = Vec::new();
    for param in params {
        if !bound.contains_key(&param.name) {
            let default = param.default.clone().expect("checked above: missing only for params without defaults");
            let thunk = Thunk::new(default, closure_env.clone());
            placeholders.push(thunk.clone());
            bound.insert(param.name.clone(), thunk);
        }
    }
    let call_env = closure_env.bind_many(bound);
    for thunk in &placeholders {
        thunk.rebind_env(call_env.clone());
    }
    Ok(call_env)
}
