//! Exported metadata records.
//!
//! Descriptors are built once during registration and are read-only once
//! the registry is frozen. Their fields are exactly what the host receives
//! from `reflect` and `query_type`.

use wirebind_core::{ArgPolicy, MethodKind, PolicyList, PrimitiveFlags, TypeHash, TypeKind};

/// A numeric or character primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveDescriptor {
    pub id: TypeHash,
    /// Derived from `size` and `flags`, e.g. `uint32_t` or `const char *`.
    pub name: String,
    /// Size in bytes.
    pub size: u32,
    pub flags: PrimitiveFlags,
}

impl PrimitiveDescriptor {
    pub fn new(size: u32, flags: PrimitiveFlags) -> Self {
        let name = flags.type_name(size);
        Self {
            id: TypeHash::from_name(&name),
            name,
            size,
            flags,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(PrimitiveFlags::UNSIGNED)
    }

    pub fn is_float(&self) -> bool {
        self.flags.contains(PrimitiveFlags::FLOAT)
    }
}

/// A non-primitive type: a builtin, a bound class, or a pointer to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: TypeHash,
    pub name: String,
    pub kind: TypeKind,
    /// The class this type is a view of, if any.
    pub class: Option<TypeHash>,
}

/// A bound class and the operations it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Same handle as `value_type`.
    pub id: TypeHash,
    pub name: String,
    /// `Name`
    pub value_type: TypeHash,
    /// `Name *`
    pub pointer_type: TypeHash,
    /// `const Name *`
    pub const_pointer_type: TypeHash,
    pub base: Option<TypeHash>,
    /// Constructor method ids, in registration order.
    pub constructors: Vec<TypeHash>,
    /// Every other member (methods, accessors, static functions, destructor).
    pub methods: Vec<TypeHash>,
}

impl ClassDescriptor {
    /// The three type handles of this class, in export order.
    pub fn type_ids(&self) -> [TypeHash; 3] {
        [self.value_type, self.pointer_type, self.const_pointer_type]
    }
}

/// A constructor, method, accessor or free function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub id: TypeHash,
    /// Owning class; `None` for free functions.
    pub owner: Option<TypeHash>,
    pub name: String,
    pub kind: MethodKind,
    pub arg_types: Vec<TypeHash>,
    pub return_type: TypeHash,
    /// Effective policy of each argument.
    pub policies: Vec<ArgPolicy>,
}

impl MethodDescriptor {
    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }
}

/// A named export handing the host a callable that produces a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueExport {
    pub name: String,
    /// Id of the method or function the host invokes.
    pub exporter: TypeHash,
}

/// Everything needed to register one method.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub owner: Option<TypeHash>,
    pub name: String,
    pub kind: MethodKind,
    pub arg_types: Vec<TypeHash>,
    pub return_type: TypeHash,
    pub policies: PolicyList,
}

impl MethodDef {
    /// A free function returning `return_type`.
    pub fn function(name: impl Into<String>, arg_types: Vec<TypeHash>, return_type: TypeHash) -> Self {
        Self {
            owner: None,
            name: name.into(),
            kind: MethodKind::Function,
            arg_types,
            return_type,
            policies: PolicyList::new(),
        }
    }

    /// A member of class `owner`.
    pub fn member(
        owner: TypeHash,
        kind: MethodKind,
        name: impl Into<String>,
        arg_types: Vec<TypeHash>,
        return_type: TypeHash,
    ) -> Self {
        Self {
            owner: Some(owner),
            name: name.into(),
            kind,
            arg_types,
            return_type,
            policies: PolicyList::new(),
        }
    }

    pub fn with_policies(mut self, policies: PolicyList) -> Self {
        self.policies = policies;
        self
    }

    /// Handle of the method this definition registers.
    ///
    /// Getters and setters hash under a kind-qualified name so that a
    /// property never collides with a method of the same name.
    pub fn id(&self) -> TypeHash {
        match (self.kind, self.owner) {
            (MethodKind::Constructor, Some(owner)) => {
                TypeHash::from_constructor(owner, &self.arg_types)
            }
            (MethodKind::Destructor, Some(owner)) => TypeHash::from_destructor(owner),
            (MethodKind::Getter | MethodKind::Setter, Some(owner)) => {
                let name = format!("{} {}", self.kind, self.name);
                TypeHash::from_method(owner, &name, &self.arg_types)
            }
            (_, Some(owner)) => TypeHash::from_method(owner, &self.name, &self.arg_types),
            (_, None) => TypeHash::from_function(&self.name, &self.arg_types),
        }
    }
}
