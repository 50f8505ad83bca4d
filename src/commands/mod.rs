// Declarative commands over the desired-state config
pub mod apply;
pub mod diff;
pub mod show;
pub mod validate;

use crate::resource::IniResource;

/// Filter INI-backed resources by a `--target` argument. Matches the
/// resource kind ("ml2_plugin") or an id prefix ("ml2", "l3_agent").
pub fn filter_targets<'a>(
    resources: Vec<&'a dyn IniResource>,
    target: Option<&str>,
) -> Vec<&'a dyn IniResource> {
    match target {
        None => resources,
        Some(target) => resources
            .into_iter()
            .filter(|r| r.kind() == target || r.id().starts_with(target))
            .collect(),
    }
}
