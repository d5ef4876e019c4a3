//! Semantic model
//!
//! [`SemanticModel`] is the read-only oracle the generators and analyzers
//! consult: which type a declaration declares, what a piece of type text or
//! an attribute name resolves to, and what a type's base type is.
//! [`Compilation`] is the in-memory implementation built from syntax trees
//! plus metadata references.

use crate::error::{PartialGenError, PartialGenResult};
use crate::model::{AttributeSyntax, DeclarationSyntax, MemberSyntax, SyntaxTree};
use crate::references::default_references;
use crate::types::{keyword_type, TypeInfo, TypeRef, TypeSyntax};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Upper bound on base-type chains, guards against cyclic inheritance in bad input
pub const MAX_BASE_DEPTH: usize = 32;

/// A declaration part together with the tree that contains it
#[derive(Debug, Clone, Copy)]
pub struct DeclarationRef<'a> {
    pub tree: &'a SyntaxTree,
    pub syntax: &'a DeclarationSyntax,
}

/// Read-only view of the host compilation
pub trait SemanticModel: Send + Sync {
    /// Every syntax tree of the compilation, in a stable order
    fn syntax_trees(&self) -> &[SyntaxTree];

    /// The type declared by a declaration part
    fn declared_type(&self, declaration: DeclarationRef<'_>) -> Option<TypeRef>;

    /// All parts of a (possibly partial) source type, in tree order
    fn declaration_parts(&self, declared: &TypeRef) -> Vec<DeclarationRef<'_>>;

    /// Resolve type text as written inside `context`
    fn resolve_type(&self, text: &str, context: DeclarationRef<'_>) -> Option<TypeRef>;

    /// Resolve an attribute to its attribute class
    fn resolve_attribute(&self, attribute: &AttributeSyntax, context: DeclarationRef<'_>) -> Option<TypeRef>;

    /// Direct base type with generic arguments substituted
    fn base_type(&self, ty: &TypeRef) -> Option<TypeRef>;

    /// Every declaration part of every tree
    fn declarations(&self) -> Vec<DeclarationRef<'_>> {
        self.syntax_trees()
            .iter()
            .flat_map(|tree| {
                tree.declarations
                    .iter()
                    .map(move |syntax| DeclarationRef { tree, syntax })
            })
            .collect()
    }
}

/// Serialisable form of a compilation, as exported by a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationSnapshot {
    #[serde(default = "default_true")]
    pub default_references: bool,
    #[serde(default)]
    pub references: Vec<TypeInfo>,
    #[serde(default)]
    pub trees: Vec<SyntaxTree>,
}

fn default_true() -> bool {
    true
}

impl Default for CompilationSnapshot {
    fn default() -> Self {
        Self {
            default_references: true,
            references: Vec::new(),
            trees: Vec::new(),
        }
    }
}

type TypeKey = (Option<String>, String, usize);

#[derive(Debug, Clone)]
enum TypeEntry {
    /// (tree index, declaration index) of every part
    Source(Vec<(usize, usize)>),
    Reference(usize),
}

/// Lookup scope for names written inside a declaration or a reference's base
struct Scope<'a> {
    namespace: Option<&'a str>,
    /// Nested-name prefixes of the enclosing types, innermost first
    enclosing: Vec<String>,
    usings: &'a [String],
    type_parameters: &'a [String],
}

impl<'a> Scope<'a> {
    fn for_declaration(declaration: DeclarationRef<'a>) -> Self {
        let mut enclosing = Vec::new();
        let mut prefix = String::new();
        for outer in &declaration.syntax.containing_types {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(&outer.name);
            enclosing.push(prefix.clone());
        }
        enclosing.push(declaration.syntax.nested_name());
        enclosing.reverse();

        Self {
            namespace: declaration.syntax.namespace.as_deref(),
            enclosing,
            usings: &declaration.tree.usings,
            type_parameters: &declaration.syntax.type_parameters,
        }
    }

    fn for_reference(info: &'a TypeInfo) -> Self {
        Self {
            namespace: info.namespace.as_deref(),
            enclosing: Vec::new(),
            usings: &[],
            type_parameters: &info.type_parameters,
        }
    }

    /// Namespace chain from innermost outwards, e.g. `A.B`, `A`
    fn namespace_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.namespace;
        while let Some(namespace) = current {
            chain.push(namespace.to_string());
            current = namespace.rfind('.').map(|i| &namespace[..i]);
        }
        chain
    }
}

/// In-memory compilation: syntax trees plus metadata references
#[derive(Debug, Clone)]
pub struct Compilation {
    snapshot: CompilationSnapshot,
    references: Vec<TypeInfo>,
    index: HashMap<TypeKey, TypeEntry>,
}

impl Compilation {
    /// Create a compilation over `trees` with the default references
    pub fn new(trees: Vec<SyntaxTree>) -> Self {
        Self::from_snapshot(CompilationSnapshot {
            trees,
            ..CompilationSnapshot::default()
        })
    }

    /// Build a compilation from its serialisable form
    pub fn from_snapshot(mut snapshot: CompilationSnapshot) -> Self {
        for tree in &mut snapshot.trees {
            tree.normalize_locations();
        }

        let mut references = if snapshot.default_references {
            default_references()
        } else {
            Vec::new()
        };
        references.extend(snapshot.references.iter().cloned());

        let mut index: HashMap<TypeKey, TypeEntry> = HashMap::new();
        for (i, info) in references.iter().enumerate() {
            let key = (info.namespace.clone(), info.name.clone(), info.type_parameters.len());
            index.insert(key, TypeEntry::Reference(i));
        }
        for (t, tree) in snapshot.trees.iter().enumerate() {
            for (d, declaration) in tree.declarations.iter().enumerate() {
                let key = (
                    declaration.namespace.clone(),
                    declaration.nested_name(),
                    declaration.type_parameters.len(),
                );
                // Source declarations shadow references with the same name
                match index.get_mut(&key) {
                    Some(TypeEntry::Source(parts)) => parts.push((t, d)),
                    _ => {
                        index.insert(key, TypeEntry::Source(vec![(t, d)]));
                    }
                }
            }
        }

        log::debug!(
            "Built compilation with {} trees, {} references and {} indexed types",
            snapshot.trees.len(),
            references.len(),
            index.len()
        );

        Self {
            snapshot,
            references,
            index,
        }
    }

    /// Parse a JSON compilation snapshot
    pub fn from_json(json: &str) -> PartialGenResult<Self> {
        let snapshot: CompilationSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load a JSON compilation snapshot from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> PartialGenResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            PartialGenError::Json(json) => PartialGenError::model_with_path(
                format!("Invalid compilation snapshot: {}", json),
                path.to_path_buf(),
            ),
            other => other,
        })
    }

    /// The serialisable form this compilation was built from
    pub fn snapshot(&self) -> &CompilationSnapshot {
        &self.snapshot
    }

    pub fn to_json(&self) -> PartialGenResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot)?)
    }

    /// Return a copy with `member` appended to the declaration part named
    /// `nested_name` in the tree at `tree_path`
    pub fn with_member_added(
        &self,
        tree_path: &str,
        nested_name: &str,
        member: MemberSyntax,
    ) -> PartialGenResult<Compilation> {
        let mut snapshot = self.snapshot.clone();
        let tree = snapshot
            .trees
            .iter_mut()
            .find(|t| t.path == tree_path)
            .ok_or_else(|| PartialGenError::model(format!("No syntax tree at '{}'", tree_path)))?;
        let declaration = tree
            .declarations
            .iter_mut()
            .find(|d| d.nested_name() == nested_name)
            .ok_or_else(|| {
                PartialGenError::model(format!("No declaration '{}' in '{}'", nested_name, tree_path))
            })?;
        declaration.members.push(member);
        Ok(Self::from_snapshot(snapshot))
    }

    fn contains(&self, namespace: Option<&str>, name: &str, arity: usize) -> bool {
        self.index
            .contains_key(&(namespace.map(str::to_string), name.to_string(), arity))
    }

    fn lookup_name(&self, name: &str, arity: usize, scope: &Scope<'_>) -> Option<(Option<String>, String)> {
        let chain = scope.namespace_chain();

        // Nested types of the enclosing types
        for prefix in &scope.enclosing {
            let nested = format!("{}.{}", prefix, name);
            for namespace in chain.iter().map(|n| Some(n.as_str())).chain(std::iter::once(None)) {
                if self.contains(namespace, &nested, arity) {
                    return Some((namespace.map(str::to_string), nested));
                }
            }
        }

        // Enclosing namespaces, then using directives, then the global namespace
        let candidates = chain
            .iter()
            .map(|n| Some(n.as_str()))
            .chain(scope.usings.iter().map(|u| Some(u.as_str())))
            .chain(std::iter::once(None));
        for namespace in candidates {
            if self.contains(namespace, name, arity) {
                return Some((namespace.map(str::to_string), name.to_string()));
            }
        }

        // Qualified names: try every split between namespace and (nested) type name
        for (i, _) in name.match_indices('.') {
            let (namespace, rest) = (&name[..i], &name[i + 1..]);
            if self.contains(Some(namespace), rest, arity) {
                return Some((Some(namespace.to_string()), rest.to_string()));
            }
            for using in scope.usings {
                let combined = format!("{}.{}", using, namespace);
                if self.contains(Some(&combined), rest, arity) {
                    return Some((Some(combined), rest.to_string()));
                }
            }
        }

        None
    }

    fn resolve_syntax(&self, syntax: &TypeSyntax, scope: &Scope<'_>) -> Option<TypeRef> {
        let args = syntax
            .args
            .iter()
            .map(|arg| self.resolve_syntax(arg, scope))
            .collect::<Option<Vec<_>>>()?;

        let mut resolved = if args.is_empty() && scope.type_parameters.iter().any(|p| *p == syntax.name) {
            TypeRef::type_parameter(syntax.name.clone())
        } else if let (true, Some(system)) = (args.is_empty(), keyword_type(&syntax.name)) {
            TypeRef::new(Some("System"), system)
        } else {
            let (namespace, name) = self.lookup_name(&syntax.name, args.len(), scope)?;
            TypeRef {
                namespace,
                name,
                args,
                array_rank: 0,
            }
        };
        resolved.array_rank = syntax.array_rank;
        Some(resolved)
    }

    fn resolve_in_scope(&self, text: &str, scope: &Scope<'_>) -> Option<TypeRef> {
        let syntax = TypeSyntax::parse(text)?;
        self.resolve_syntax(&syntax, scope)
    }

    fn part(&self, tree: usize, declaration: usize) -> Option<DeclarationRef<'_>> {
        let tree = self.snapshot.trees.get(tree)?;
        let syntax = tree.declarations.get(declaration)?;
        Some(DeclarationRef { tree, syntax })
    }
}

impl SemanticModel for Compilation {
    fn syntax_trees(&self) -> &[SyntaxTree] {
        &self.snapshot.trees
    }

    fn declared_type(&self, declaration: DeclarationRef<'_>) -> Option<TypeRef> {
        let syntax = declaration.syntax;
        if syntax.name.is_empty() {
            return None;
        }
        Some(TypeRef {
            namespace: syntax.namespace.clone(),
            name: syntax.nested_name(),
            args: syntax
                .type_parameters
                .iter()
                .map(|p| TypeRef::type_parameter(p.clone()))
                .collect(),
            array_rank: 0,
        })
    }

    fn declaration_parts(&self, declared: &TypeRef) -> Vec<DeclarationRef<'_>> {
        let key = (declared.namespace.clone(), declared.name.clone(), declared.args.len());
        match self.index.get(&key) {
            Some(TypeEntry::Source(parts)) => parts
                .iter()
                .filter_map(|(t, d)| self.part(*t, *d))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn resolve_type(&self, text: &str, context: DeclarationRef<'_>) -> Option<TypeRef> {
        self.resolve_in_scope(text, &Scope::for_declaration(context))
    }

    fn resolve_attribute(&self, attribute: &AttributeSyntax, context: DeclarationRef<'_>) -> Option<TypeRef> {
        let scope = Scope::for_declaration(context);
        if !attribute.name.ends_with("Attribute") {
            let suffixed = format!("{}Attribute", attribute.name);
            if let Some(resolved) = self.resolve_in_scope(&suffixed, &scope) {
                return Some(resolved);
            }
        }
        self.resolve_in_scope(&attribute.name, &scope)
    }

    fn base_type(&self, ty: &TypeRef) -> Option<TypeRef> {
        if ty.array_rank > 0 {
            return None;
        }
        let key = (ty.namespace.clone(), ty.name.clone(), ty.args.len());
        let (base, parameters) = match self.index.get(&key)? {
            TypeEntry::Reference(i) => {
                let info = &self.references[*i];
                let base = self.resolve_in_scope(info.base.as_deref()?, &Scope::for_reference(info))?;
                (base, &info.type_parameters)
            }
            TypeEntry::Source(parts) => {
                let found = parts.iter().find_map(|(t, d)| {
                    let part = self.part(*t, *d)?;
                    let scope = Scope::for_declaration(part);
                    part.syntax
                        .base_list
                        .iter()
                        .find_map(|text| self.resolve_in_scope(text, &scope))
                        .map(|base| (base, &part.syntax.type_parameters))
                });
                found?
            }
        };
        Some(base.substitute(parameters, &ty.args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeSyntax, DeclarationKind, DeclarationSyntax, MemberSyntax};

    fn compilation() -> Compilation {
        Compilation::new(vec![
            SyntaxTree::new("Assets/Channels.cs").with_declaration(
                DeclarationSyntax::class("HealthChannel")
                    .in_namespace("Game.Events")
                    .with_base("Partialgen.ValueNotifier<int>"),
            ),
            SyntaxTree::new("Assets/Player.cs")
                .with_using("Partialgen")
                .with_using("Game.Events")
                .with_declaration(
                    DeclarationSyntax::class("Player")
                        .in_namespace("Game")
                        .partial()
                        .with_member(MemberSyntax::field("health", "HealthChannel")),
                )
                .with_declaration(
                    DeclarationSyntax::class("Stats")
                        .in_namespace("Game")
                        .nested_in("Player", DeclarationKind::Class)
                        .partial(),
                ),
            SyntaxTree::new("Assets/Player.Input.cs").with_declaration(
                DeclarationSyntax::class("Player").in_namespace("Game").partial(),
            ),
            SyntaxTree::new("Assets/Generic.cs").with_declaration(
                DeclarationSyntax::class("Wrapper")
                    .with_type_parameter("T")
                    .with_base("Partialgen.ValueNotifier<T>"),
            ),
        ])
    }

    fn player(compilation: &Compilation) -> DeclarationRef<'_> {
        compilation.declarations()[1]
    }

    #[test]
    fn test_resolve_through_usings_and_keywords() {
        let compilation = compilation();
        let context = player(&compilation);

        let channel = compilation.resolve_type("HealthChannel", context).unwrap();
        assert_eq!(channel, TypeRef::new(Some("Game.Events"), "HealthChannel"));

        let notifier = compilation.resolve_type("ValueNotifier<int>", context).unwrap();
        assert_eq!(notifier.to_string(), "Partialgen.ValueNotifier<int>");
        assert_eq!(
            compilation.resolve_type("ValueNotifier<System.Int32>", context),
            Some(notifier)
        );
    }

    #[test]
    fn test_unresolved_names() {
        let compilation = compilation();
        let context = player(&compilation);

        assert!(compilation.resolve_type("Missing", context).is_none());
        assert!(compilation.resolve_type("ValueNotifier<Missing>", context).is_none());
        assert!(compilation.resolve_type("List<int", context).is_none());
        // Sprite needs `using UnityEngine;`
        assert!(compilation.resolve_type("Sprite", context).is_none());
        assert!(compilation.resolve_type("UnityEngine.Sprite", context).is_some());
    }

    #[test]
    fn test_nested_and_qualified_lookup() {
        let compilation = compilation();
        let context = player(&compilation);

        let stats = compilation.resolve_type("Stats", context).unwrap();
        assert_eq!(stats, TypeRef::new(Some("Game"), "Player.Stats"));

        let callback = compilation
            .resolve_type("UnityEngine.InputSystem.InputAction.CallbackContext", context)
            .unwrap();
        assert_eq!(callback.name, "InputAction.CallbackContext");
    }

    #[test]
    fn test_partial_parts_are_grouped() {
        let compilation = compilation();
        let declared = compilation.declared_type(player(&compilation)).unwrap();
        let parts = compilation.declaration_parts(&declared);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].tree.path, "Assets/Player.cs");
        assert_eq!(parts[1].tree.path, "Assets/Player.Input.cs");
    }

    #[test]
    fn test_base_types_with_substitution() {
        let compilation = compilation();

        let channel = TypeRef::new(Some("Game.Events"), "HealthChannel");
        let base = compilation.base_type(&channel).unwrap();
        assert_eq!(base.to_string(), "Partialgen.ValueNotifier<int>");

        let wrapper = TypeRef::new(None, "Wrapper").with_args(vec![TypeRef::keyword("float").unwrap()]);
        assert_eq!(
            compilation.base_type(&wrapper).unwrap().to_string(),
            "Partialgen.ValueNotifier<float>"
        );

        let sprite_reference = TypeRef::new(Some("UnityEngine.AddressableAssets"), "AssetReferenceSprite");
        assert_eq!(
            compilation.base_type(&sprite_reference).unwrap().to_string(),
            "UnityEngine.AddressableAssets.AssetReferenceT<UnityEngine.Sprite>"
        );
    }

    #[test]
    fn test_attribute_resolution() {
        let compilation = compilation();
        let context = player(&compilation);

        let short = compilation
            .resolve_attribute(&AttributeSyntax::new("GenerateLoader"), context)
            .unwrap();
        let long = compilation
            .resolve_attribute(&AttributeSyntax::new("Partialgen.GenerateLoaderAttribute"), context)
            .unwrap();
        assert_eq!(short, long);
        assert!(compilation
            .resolve_attribute(&AttributeSyntax::new("Unknown"), context)
            .is_none());
    }

    #[test]
    fn test_member_insertion_and_json_round_trip() {
        let compilation = compilation();
        let updated = compilation
            .with_member_added(
                "Assets/Player.Input.cs",
                "Player",
                MemberSyntax::method("OnHealthChanged", "void"),
            )
            .unwrap();
        assert_eq!(updated.syntax_trees()[2].declarations[0].members.len(), 1);
        assert!(compilation.syntax_trees()[2].declarations[0].members.is_empty());

        let reloaded = Compilation::from_json(&updated.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.snapshot(), updated.snapshot());

        assert!(compilation
            .with_member_added("Missing.cs", "Player", MemberSyntax::method("X", "void"))
            .is_err());
    }
}
