//! Symbol index and call-reference resolution.
//!
//! Runs only after every file of the workspace has been extracted: the
//! lookup index needs global visibility, so this is the synchronization
//! barrier of the pipeline. The index is built once and immutable, which
//! is what makes per-profile edge computation safe to parallelize.
//!
//! Resolution policy, applied per reference in order:
//! 1. exact qualified-name match within the same file;
//! 2. enclosing-class method via an explicit `self.`/`cls.` receiver;
//! 3. unique bare-name match across the whole workspace;
//! 4. zero or multiple remaining candidates: the reference is dropped.
//!    Ambiguity never fabricates an edge.

use crate::{CallEdge, Confidence, Profile, ProfileId, ProfileKind};
use rayon::prelude::*;
use std::collections::HashMap;

/// Immutable qualified-name lookup over one workspace.
pub struct SymbolIndex {
    /// file path -> local qualified name (`Helper.run`, `g`) -> candidates
    by_file: HashMap<String, HashMap<String, Vec<ProfileId>>>,
    /// class profile -> method name -> method profile
    methods_by_class: HashMap<ProfileId, HashMap<String, ProfileId>>,
    /// bare name -> candidates across the workspace
    by_bare: HashMap<String, Vec<ProfileId>>,
}

impl SymbolIndex {
    pub fn build(profiles: &[Profile]) -> Self {
        let mut by_file: HashMap<String, HashMap<String, Vec<ProfileId>>> = HashMap::new();
        let mut methods_by_class: HashMap<ProfileId, HashMap<String, ProfileId>> = HashMap::new();
        let mut by_bare: HashMap<String, Vec<ProfileId>> = HashMap::new();

        for profile in profiles {
            if !matches!(
                profile.kind,
                ProfileKind::Class | ProfileKind::Function | ProfileKind::Method
            ) {
                continue;
            }

            by_file
                .entry(profile.file_path.clone())
                .or_default()
                .entry(profile.local_name().to_string())
                .or_default()
                .push(profile.id);

            by_bare
                .entry(profile.name.clone())
                .or_default()
                .push(profile.id);

            if profile.kind == ProfileKind::Method
                && let Some(parent) = profile.parent_id
            {
                methods_by_class
                    .entry(parent)
                    .or_default()
                    .insert(profile.name.clone(), profile.id);
            }
        }

        Self {
            by_file,
            methods_by_class,
            by_bare,
        }
    }

    fn in_file(&self, file_path: &str, local_name: &str) -> Option<&[ProfileId]> {
        self.by_file
            .get(file_path)
            .and_then(|names| names.get(local_name))
            .map(|v| v.as_slice())
    }

    fn class_method(&self, class: ProfileId, name: &str) -> Option<ProfileId> {
        self.methods_by_class.get(&class)?.get(name).copied()
    }

    fn by_bare_name(&self, name: &str) -> &[ProfileId] {
        self.by_bare.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Resolves raw call references into edges against an immutable
/// [`SymbolIndex`] snapshot.
pub struct Resolver {
    index: SymbolIndex,
    parents: HashMap<ProfileId, Option<ProfileId>>,
    kinds: HashMap<ProfileId, ProfileKind>,
}

impl Resolver {
    /// Build the lookup index. Requires the complete profile set of the
    /// workspace; never run this per file.
    pub fn new(profiles: &[Profile]) -> Self {
        let parents = profiles.iter().map(|p| (p.id, p.parent_id)).collect();
        let kinds = profiles.iter().map(|p| (p.id, p.kind)).collect();
        Self {
            index: SymbolIndex::build(profiles),
            parents,
            kinds,
        }
    }

    /// Resolve every profile's outbound references. Output order follows
    /// profile order, then reference source order, so identical input
    /// yields identical edges.
    pub fn resolve(&self, profiles: &[Profile]) -> Vec<CallEdge> {
        profiles
            .par_iter()
            .flat_map_iter(|profile| {
                profile
                    .calls
                    .iter()
                    .filter_map(|call| self.resolve_reference(profile, call))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn resolve_reference(&self, caller: &Profile, call: &str) -> Option<CallEdge> {
        let bare = bare_name(call);
        if bare.is_empty() || is_dunder(bare) {
            return None;
        }

        // Rule 1: exact qualified match in the caller's own file.
        if let Some(candidates) = self.index.in_file(&caller.file_path, call) {
            return match candidates {
                [single] => Some(CallEdge {
                    caller: caller.id,
                    callee: *single,
                    confidence: Confidence::Exact,
                }),
                // Several same-named definitions in one file: ambiguous.
                _ => None,
            };
        }

        // Rule 2: `self.method()` / `cls.method()` against the enclosing
        // class's own methods.
        if let Some(method) = call.strip_prefix("self.").or_else(|| call.strip_prefix("cls."))
            && !method.contains('.')
            && let Some(class) = self.enclosing_class(caller.id)
            && let Some(callee) = self.index.class_method(class, method)
        {
            return Some(CallEdge {
                caller: caller.id,
                callee,
                confidence: Confidence::Exact,
            });
        }

        // Rule 3: unique bare-name match across the workspace.
        match self.index.by_bare_name(bare) {
            [single] => Some(CallEdge {
                caller: caller.id,
                callee: *single,
                confidence: Confidence::Heuristic,
            }),
            _ => None,
        }
    }

    /// Nearest `Class` ancestor of a profile, if any.
    fn enclosing_class(&self, id: ProfileId) -> Option<ProfileId> {
        let mut current = self.parents.get(&id).copied().flatten();
        while let Some(ancestor) = current {
            match self.kinds.get(&ancestor) {
                Some(ProfileKind::Class) => return Some(ancestor),
                Some(ProfileKind::File | ProfileKind::Directory | ProfileKind::Root) | None => {
                    return None;
                }
                _ => current = self.parents.get(&ancestor).copied().flatten(),
            }
        }
        None
    }
}

/// Last dotted segment of a reference (`requests.get` -> `get`).
fn bare_name(call: &str) -> &str {
    call.rsplit('.').next().unwrap_or(call)
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{LanguageParser, PythonParser};
    use crate::{EnrichmentRecord, FileId, Range};

    fn extract_all(files: &[(&str, &str)]) -> Vec<Profile> {
        let mut parser = PythonParser::new().unwrap();
        let mut profiles = Vec::new();
        let mut counter = 0;
        for (i, (path, source)) in files.iter().enumerate() {
            let file_id = FileId::new(i as u32 + 1).unwrap();
            profiles.extend(parser.extract(source, path, file_id, &mut counter).unwrap());
        }
        profiles
    }

    fn find<'a>(profiles: &'a [Profile], qualified: &str) -> &'a Profile {
        profiles
            .iter()
            .find(|p| p.qualified_name == qualified)
            .unwrap()
    }

    #[test]
    fn test_file_local_resolution_is_exact() {
        let profiles = extract_all(&[(
            "app.py",
            r#"
def g():
    pass


def f():
    g()
"#,
        )]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let f = find(&profiles, "app.py::f");
        let g = find(&profiles, "app.py::g");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].caller, f.id);
        assert_eq!(edges[0].callee, g.id);
        assert_eq!(edges[0].confidence, Confidence::Exact);
    }

    #[test]
    fn test_self_call_resolves_to_own_method() {
        let profiles = extract_all(&[(
            "svc.py",
            r#"
class Service:
    def run(self):
        self.step()

    def step(self):
        pass
"#,
        )]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let run = find(&profiles, "svc.py::Service.run");
        let step = find(&profiles, "svc.py::Service.step");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].caller, run.id);
        assert_eq!(edges[0].callee, step.id);
        assert_eq!(edges[0].confidence, Confidence::Exact);
    }

    #[test]
    fn test_unique_global_match_is_heuristic() {
        let profiles = extract_all(&[
            (
                "a.py",
                r#"
def f():
    g()
"#,
            ),
            (
                "b.py",
                r#"
def g():
    pass
"#,
            ),
        ]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let f = find(&profiles, "a.py::f");
        let g = find(&profiles, "b.py::g");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].caller, f.id);
        assert_eq!(edges[0].callee, g.id);
        assert_eq!(edges[0].confidence, Confidence::Heuristic);
    }

    #[test]
    fn test_ambiguous_references_are_dropped() {
        let profiles = extract_all(&[
            (
                "a.py",
                r#"
def helper():
    pass
"#,
            ),
            (
                "b.py",
                r#"
def helper():
    pass
"#,
            ),
            (
                "c.py",
                r#"
def f():
    helper()
"#,
            ),
        ]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_unresolvable_reference_emits_nothing() {
        let profiles = extract_all(&[(
            "a.py",
            r#"
def f():
    requests.get("http://x")
"#,
        )]);
        let resolver = Resolver::new(&profiles);
        // `get` has no candidate in the workspace.
        assert!(resolver.resolve(&profiles).is_empty());
    }

    #[test]
    fn test_dunder_calls_are_noise() {
        let profiles = extract_all(&[(
            "a.py",
            r#"
class A:
    def __init__(self):
        pass


def f():
    a.__init__()
"#,
        )]);
        let resolver = Resolver::new(&profiles);
        assert!(resolver.resolve(&profiles).is_empty());
    }

    #[test]
    fn test_file_local_beats_global() {
        let profiles = extract_all(&[
            (
                "a.py",
                r#"
def g():
    pass


def f():
    g()
"#,
            ),
            (
                "b.py",
                r#"
def g():
    pass
"#,
            ),
        ]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let local_g = find(&profiles, "a.py::g");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].callee, local_g.id);
        assert_eq!(edges[0].confidence, Confidence::Exact);
    }

    #[test]
    fn test_recursive_call_is_an_edge() {
        let profiles = extract_all(&[(
            "a.py",
            r#"
def fact(n):
    return fact(n - 1)
"#,
        )]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let fact = find(&profiles, "a.py::fact");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].caller, fact.id);
        assert_eq!(edges[0].callee, fact.id);
    }

    #[test]
    fn test_every_edge_references_known_profiles() {
        let profiles = extract_all(&[
            (
                "a.py",
                r#"
class Svc:
    def run(self):
        self.helper()
        parse(load())

    def helper(self):
        unknown_thing()
"#,
            ),
            (
                "b.py",
                r#"
def parse(data):
    pass


def load():
    pass
"#,
            ),
        ]);
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let known: std::collections::HashSet<ProfileId> =
            profiles.iter().map(|p| p.id).collect();
        assert!(!edges.is_empty());
        for edge in &edges {
            assert!(known.contains(&edge.caller));
            assert!(known.contains(&edge.callee));
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let files = [
            (
                "a.py",
                r#"
def f():
    g()
    h()
"#,
            ),
            (
                "b.py",
                r#"
def g():
    pass


def h():
    g()
"#,
            ),
        ];
        let profiles = extract_all(&files);
        let resolver = Resolver::new(&profiles);
        let first = resolver.resolve(&profiles);
        let second = resolver.resolve(&profiles);
        assert_eq!(first, second);
    }

    #[test]
    fn test_index_skips_non_unit_profiles() {
        let mut profiles = extract_all(&[(
            "a.py",
            r#"
def f():
    data()
"#,
        )]);
        // A synthesized directory profile named like the callee must not
        // become a call target.
        profiles.push(Profile {
            id: ProfileId::new(99).unwrap(),
            kind: ProfileKind::Directory,
            name: "data".into(),
            qualified_name: "data".into(),
            file_path: "data".into(),
            file_id: None,
            range: Range::new(1, 1, 0, 0),
            doc: None,
            params: Vec::new(),
            calls: Vec::new(),
            parent_id: None,
            enrichment: EnrichmentRecord::default(),
            score: None,
        });

        let resolver = Resolver::new(&profiles);
        assert!(resolver.resolve(&profiles).is_empty());
    }
}
