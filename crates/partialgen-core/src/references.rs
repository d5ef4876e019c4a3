//! Default metadata references
//!
//! The types a Unity project using the partialgen runtime always sees: the
//! runtime's notifiers and annotation attributes, Addressables, the Input
//! System and the handful of engine types they mention. Compilations include
//! them unless a snapshot opts out.

use crate::types::TypeInfo;

/// Namespace of the partialgen runtime package
pub const RUNTIME_NAMESPACE: &str = "Partialgen";

pub const ADDRESSABLES_NAMESPACE: &str = "UnityEngine.AddressableAssets";
pub const ASYNC_OPERATIONS_NAMESPACE: &str = "UnityEngine.ResourceManagement.AsyncOperations";
pub const INPUT_SYSTEM_NAMESPACE: &str = "UnityEngine.InputSystem";

const SYSTEM_TYPES: &[&str] = &[
    "Boolean", "Byte", "SByte", "Char", "Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64",
    "Single", "Double", "Decimal", "String", "Object", "Void", "Action", "NotImplementedException",
];

/// Build the default reference set
pub fn default_references() -> Vec<TypeInfo> {
    let mut references: Vec<TypeInfo> = SYSTEM_TYPES
        .iter()
        .map(|name| TypeInfo::new("System", *name))
        .collect();

    references.extend([
        // Runtime notifiers and annotations
        TypeInfo::generic(RUNTIME_NAMESPACE, "ValueNotifier", &["T"]),
        TypeInfo::new(RUNTIME_NAMESPACE, "EventNotifier"),
        TypeInfo::generic(RUNTIME_NAMESPACE, "EventNotifier", &["T"]),
        TypeInfo::new(RUNTIME_NAMESPACE, "GenerateLoaderAttribute"),
        TypeInfo::new(RUNTIME_NAMESPACE, "GenerateSubscribeMethodsAttribute"),
        TypeInfo::new(RUNTIME_NAMESPACE, "GenerateInputCallbacksAttribute"),
        // Engine
        TypeInfo::new("UnityEngine", "Object"),
        TypeInfo::new("UnityEngine", "GameObject").with_base("Object"),
        TypeInfo::new("UnityEngine", "Component").with_base("Object"),
        TypeInfo::new("UnityEngine", "Behaviour").with_base("Component"),
        TypeInfo::new("UnityEngine", "MonoBehaviour").with_base("Behaviour"),
        TypeInfo::new("UnityEngine", "ScriptableObject").with_base("Object"),
        TypeInfo::new("UnityEngine", "Texture").with_base("Object"),
        TypeInfo::new("UnityEngine", "Texture2D").with_base("Texture"),
        TypeInfo::new("UnityEngine", "Sprite").with_base("Object"),
        TypeInfo::new("UnityEngine", "AudioClip").with_base("Object"),
        TypeInfo::new("UnityEngine", "Material").with_base("Object"),
        TypeInfo::new("UnityEngine", "SerializeField"),
        // Addressables
        TypeInfo::new(ADDRESSABLES_NAMESPACE, "Addressables"),
        TypeInfo::new(ADDRESSABLES_NAMESPACE, "AssetReference"),
        TypeInfo::generic(ADDRESSABLES_NAMESPACE, "AssetReferenceT", &["TObject"]).with_base("AssetReference"),
        TypeInfo::new(ADDRESSABLES_NAMESPACE, "AssetReferenceGameObject")
            .with_base("AssetReferenceT<UnityEngine.GameObject>"),
        TypeInfo::new(ADDRESSABLES_NAMESPACE, "AssetReferenceSprite").with_base("AssetReferenceT<UnityEngine.Sprite>"),
        TypeInfo::new(ADDRESSABLES_NAMESPACE, "AssetReferenceTexture")
            .with_base("AssetReferenceT<UnityEngine.Texture>"),
        TypeInfo::new(ADDRESSABLES_NAMESPACE, "AssetReferenceTexture2D")
            .with_base("AssetReferenceT<UnityEngine.Texture2D>"),
        TypeInfo::generic(ASYNC_OPERATIONS_NAMESPACE, "AsyncOperationHandle", &["TObject"]),
        TypeInfo::new(ASYNC_OPERATIONS_NAMESPACE, "AsyncOperationStatus"),
        // Input System
        TypeInfo::new(INPUT_SYSTEM_NAMESPACE, "InputActionAsset").with_base("UnityEngine.ScriptableObject"),
        TypeInfo::new(INPUT_SYSTEM_NAMESPACE, "InputActionMap"),
        TypeInfo::new(INPUT_SYSTEM_NAMESPACE, "InputAction"),
        TypeInfo::new(INPUT_SYSTEM_NAMESPACE, "InputAction.CallbackContext"),
        TypeInfo::new(INPUT_SYSTEM_NAMESPACE, "PlayerInput").with_base("UnityEngine.MonoBehaviour"),
    ]);

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_references_are_unique() {
        let references = default_references();
        let mut keys: Vec<(Option<String>, String, usize)> = references
            .iter()
            .map(|r| (r.namespace.clone(), r.name.clone(), r.type_parameters.len()))
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}
