//! Strategic merge of trait patches into rendered workloads.
//!
//! Rules:
//! - objects merge key by key, recursively
//! - lists with a `patchKey` merge elements that share the key value and
//!   append the rest
//! - lists without a key merge positionally; extra patch elements append
//! - `patchStrategy=replace` replaces the target field wholesale
//! - any other patch value replaces the target value

use std::collections::BTreeMap;

use serde_json::Value;

use super::ast::PatchStrategy;

/// Segment used in directive paths for "any list element".
pub const LIST_ELEMENT: &str = "*";

/// Merge directive for a single field of a patch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchDirective {
    pub key: Option<String>,
    pub strategy: PatchStrategy,
}

/// A patch document plus the directives declared on its fields.
///
/// Directive paths are relative to the patch root; list elements are
/// addressed with [`LIST_ELEMENT`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    document: Value,
    directives: BTreeMap<Vec<String>, PatchDirective>,
}

impl Patch {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            directives: BTreeMap::new(),
        }
    }

    pub fn with_directive(mut self, path: &[&str], directive: PatchDirective) -> Self {
        self.directives
            .insert(path.iter().map(|s| (*s).to_string()).collect(), directive);
        self
    }

    pub(crate) fn insert_directive(&mut self, path: Vec<String>, directive: PatchDirective) {
        self.directives.insert(path, directive);
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn directive(&self, path: &[String]) -> Option<&PatchDirective> {
        self.directives.get(path)
    }

    /// Merge this patch into `target` in place.
    pub fn apply(&self, target: &mut Value) {
        let mut path = Vec::new();
        self.merge(target, &self.document, &mut path);
    }

    fn merge(&self, target: &mut Value, patch: &Value, path: &mut Vec<String>) {
        let directive = self.directives.get(path.as_slice());
        if directive.is_some_and(|d| d.strategy == PatchStrategy::Replace) {
            *target = patch.clone();
            return;
        }

        match (&mut *target, patch) {
            (Value::Object(target_map), Value::Object(patch_map)) => {
                for (key, patch_value) in patch_map {
                    path.push(key.clone());
                    match target_map.get_mut(key) {
                        Some(existing) => self.merge(existing, patch_value, path),
                        None => {
                            target_map.insert(key.clone(), patch_value.clone());
                        }
                    }
                    path.pop();
                }
            }
            (Value::Array(target_items), Value::Array(patch_items)) => {
                let key = directive.and_then(|d| d.key.clone());
                path.push(LIST_ELEMENT.to_string());
                match key {
                    Some(key) => {
                        for patch_item in patch_items {
                            let id = patch_item.get(&key);
                            let existing = id.and_then(|id| {
                                target_items
                                    .iter_mut()
                                    .find(|item| item.get(&key) == Some(id))
                            });
                            match existing {
                                Some(item) => self.merge(item, patch_item, path),
                                None => target_items.push(patch_item.clone()),
                            }
                        }
                    }
                    None => {
                        for (i, patch_item) in patch_items.iter().enumerate() {
                            match target_items.get_mut(i) {
                                Some(item) => self.merge(item, patch_item, path),
                                None => target_items.push(patch_item.clone()),
                            }
                        }
                    }
                }
                path.pop();
            }
            (slot, value) => *slot = value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn keyed(key: &str) -> PatchDirective {
        PatchDirective {
            key: Some(key.to_string()),
            strategy: PatchStrategy::Merge,
        }
    }

    #[test]
    fn test_objects_merge_recursively() {
        let mut target = json!({"metadata": {"name": "a", "labels": {"x": "1"}}});
        Patch::new(json!({"metadata": {"labels": {"y": "2"}}})).apply(&mut target);
        assert_eq!(
            target,
            json!({"metadata": {"name": "a", "labels": {"x": "1", "y": "2"}}})
        );
    }

    #[test]
    fn test_scalar_patch_replaces_target() {
        let mut target = json!({"spec": {"replicas": 1}});
        Patch::new(json!({"spec": {"replicas": 3}})).apply(&mut target);
        assert_eq!(target, json!({"spec": {"replicas": 3}}));
    }

    #[test]
    fn test_keyed_list_appends_new_element() {
        let path = ["spec", "containers"];
        let mut target = json!({"spec": {"containers": [{"name": "main", "image": "nginx"}]}});
        Patch::new(json!({"spec": {"containers": [{"name": "sidecar", "image": "busybox"}]}}))
            .with_directive(&path, keyed("name"))
            .apply(&mut target);
        assert_eq!(
            target,
            json!({"spec": {"containers": [
                {"name": "main", "image": "nginx"},
                {"name": "sidecar", "image": "busybox"}
            ]}})
        );
    }

    #[test]
    fn test_keyed_list_merges_matching_element() {
        let path = ["containers"];
        let mut target = json!({"containers": [
            {"name": "a", "image": "x"},
            {"name": "b", "image": "y"}
        ]});
        Patch::new(json!({"containers": [{"name": "b", "env": [{"name": "K", "value": "V"}]}]}))
            .with_directive(&path, keyed("name"))
            .apply(&mut target);
        assert_eq!(
            target,
            json!({"containers": [
                {"name": "a", "image": "x"},
                {"name": "b", "image": "y", "env": [{"name": "K", "value": "V"}]}
            ]})
        );
    }

    #[test]
    fn test_unkeyed_list_merges_positionally() {
        let mut target = json!({"containers": [{"name": "main", "image": "nginx"}]});
        Patch::new(json!({"containers": [{"ports": [{"containerPort": 80}]}, {"name": "extra"}]}))
            .apply(&mut target);
        assert_eq!(
            target,
            json!({"containers": [
                {"name": "main", "image": "nginx", "ports": [{"containerPort": 80}]},
                {"name": "extra"}
            ]})
        );
    }

    #[test]
    fn test_replace_strategy() {
        let mut target = json!({"volumes": [{"name": "a"}, {"name": "b"}]});
        Patch::new(json!({"volumes": [{"name": "c"}]}))
            .with_directive(
                &["volumes"],
                PatchDirective {
                    key: None,
                    strategy: PatchStrategy::Replace,
                },
            )
            .apply(&mut target);
        assert_eq!(target, json!({"volumes": [{"name": "c"}]}));
    }

    #[test]
    fn test_nested_directive_inside_list_element() {
        let mut target = json!({"containers": [{"name": "main", "env": [{"name": "A", "value": "1"}]}]});
        Patch::new(json!({"containers": [{"name": "main", "env": [{"name": "A", "value": "2"}, {"name": "B", "value": "3"}]}]}))
            .with_directive(&["containers"], keyed("name"))
            .with_directive(&["containers", LIST_ELEMENT, "env"], keyed("name"))
            .apply(&mut target);
        assert_eq!(
            target,
            json!({"containers": [{"name": "main", "env": [
                {"name": "A", "value": "2"},
                {"name": "B", "value": "3"}
            ]}]})
        );
    }

    #[test]
    fn test_missing_fields_are_added() {
        let mut target = json!({"spec": {}});
        Patch::new(json!({"spec": {"template": {"metadata": {"annotations": {"a": "b"}}}}}))
            .apply(&mut target);
        assert_eq!(
            target,
            json!({"spec": {"template": {"metadata": {"annotations": {"a": "b"}}}}})
        );
    }
}
