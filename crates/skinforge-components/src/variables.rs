//! Variable declaration document prepended to every stylesheet compilation.
//!
//! The document declares one `$include-<id>-component` flag per registered
//! component so themes can test any flag without the compiler failing on an
//! undefined variable.
//!
//! Two passes are emitted. Active ids are declared `true` first, then every
//! registered id is declared `false`. Both use `!default`, under which the
//! first assignment of a variable wins and later ones are ignored, so active
//! components end up `true` and everything else `false`.

use crate::registry::ComponentRegistry;
use crate::resolver::ActiveComponentSet;

/// Name of the inclusion flag for a component id.
pub fn flag_name(id: &str) -> String {
    format!("$include-{}-component", id)
}

/// Synthesize the variable document for an active set.
pub fn synthesize(active: &ActiveComponentSet, registry: &ComponentRegistry) -> String {
    let mut lines = Vec::with_capacity(active.len() + registry.len());

    for id in active.iter() {
        lines.push(declaration(id, true));
    }

    for id in registry.ids() {
        lines.push(declaration(id, false));
    }

    lines.join("\n")
}

fn declaration(id: &str, value: bool) -> String {
    format!("{}: {} !default;", flag_name(id), value)
}
