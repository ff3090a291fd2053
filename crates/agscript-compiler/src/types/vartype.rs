//! The type of a value, variable or parameter.

use crate::bytecode::{OLD_STRING_SIZE, POINTER_SIZE};

use super::{TypeId, TypeTable};

/// The type a [`VarType`] is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    /// The legacy fixed-buffer `string`.
    OldString,
    /// The type of `null`.
    Null,
    Struct(TypeId),
    Enum(TypeId),
}

impl BaseType {
    /// Size in bytes of one value of this type, not counting pointers.
    pub fn size(self, types: &TypeTable) -> u32 {
        match self {
            BaseType::Void | BaseType::Null => 0,
            BaseType::Char => 1,
            BaseType::Short => 2,
            BaseType::Int | BaseType::Long | BaseType::Float | BaseType::Enum(_) => 4,
            BaseType::OldString => OLD_STRING_SIZE,
            BaseType::Struct(id) => types.struct_def(id).map_or(0, |s| s.size),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BaseType::Char | BaseType::Short | BaseType::Int | BaseType::Long | BaseType::Enum(_)
        )
    }
}

/// Array-ness of a [`VarType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ArrayShape {
    #[default]
    Scalar,
    /// `T a[2][3]`: dimensions, outermost first.
    Static(Vec<u32>),
    /// `T a[]`: a managed handle to a heap array.
    Dynamic,
}

/// A complete type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarType {
    pub base: BaseType,
    pub is_const: bool,
    /// `T*`; only managed structs can be pointed to.
    pub pointer: bool,
    pub array: ArrayShape,
}

impl VarType {
    pub fn new(base: BaseType) -> Self {
        Self {
            base,
            is_const: false,
            pointer: false,
            array: ArrayShape::Scalar,
        }
    }

    pub fn void() -> Self {
        Self::new(BaseType::Void)
    }

    pub fn int() -> Self {
        Self::new(BaseType::Int)
    }

    pub fn float() -> Self {
        Self::new(BaseType::Float)
    }

    pub fn null() -> Self {
        Self::new(BaseType::Null)
    }

    /// The type of a string literal.
    pub fn const_string() -> Self {
        Self {
            is_const: true,
            ..Self::new(BaseType::OldString)
        }
    }

    pub fn pointer_to(id: TypeId) -> Self {
        Self {
            pointer: true,
            ..Self::new(BaseType::Struct(id))
        }
    }

    pub fn with_array(mut self, array: ArrayShape) -> Self {
        self.array = array;
        self
    }

    // =========================================================================
    // Classification
    // =========================================================================

    pub fn is_void(&self) -> bool {
        self.base == BaseType::Void && self.is_scalar()
    }

    pub fn is_null(&self) -> bool {
        self.base == BaseType::Null
    }

    pub fn is_scalar(&self) -> bool {
        self.array == ArrayShape::Scalar
    }

    /// Any of the integer types or an enum, not an array.
    pub fn is_integer(&self) -> bool {
        self.is_scalar() && !self.pointer && self.base.is_integer()
    }

    pub fn is_float(&self) -> bool {
        self.is_scalar() && !self.pointer && self.base == BaseType::Float
    }

    pub fn is_static_array(&self) -> bool {
        matches!(self.array, ArrayShape::Static(_))
    }

    pub fn is_dynarray(&self) -> bool {
        self.array == ArrayShape::Dynamic
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer && self.is_scalar()
    }

    /// Whether a value of this type is a managed handle (pointer or dynamic
    /// array) that the VM reference counts.
    pub fn is_dyn(&self) -> bool {
        self.is_pointer() || self.is_dynarray()
    }

    /// A legacy `string` buffer or a string literal.
    pub fn is_old_string(&self) -> bool {
        self.is_scalar() && !self.pointer && self.base == BaseType::OldString
    }

    /// A struct held by value.
    pub fn is_struct_instance(&self) -> bool {
        self.is_scalar() && !self.pointer && matches!(self.base, BaseType::Struct(_))
    }

    pub fn struct_id(&self) -> Option<TypeId> {
        match self.base {
            BaseType::Struct(id) => Some(id),
            _ => None,
        }
    }

    /// Whether this is a handle to the string struct marked `internalstring`.
    pub fn is_string_struct(&self, types: &TypeTable) -> bool {
        self.is_pointer()
            && self
                .struct_id()
                .and_then(|id| types.struct_def(id))
                .is_some_and(|s| s.internalstring)
    }

    /// Either kind of string value.
    pub fn is_any_string(&self, types: &TypeTable) -> bool {
        self.is_old_string() || self.is_string_struct(types)
    }

    // =========================================================================
    // Derived types and sizes
    // =========================================================================

    /// The type of one element of an array, or `self` for a scalar.
    pub fn element(&self) -> VarType {
        VarType {
            array: ArrayShape::Scalar,
            ..self.clone()
        }
    }

    /// The type left after applying one index to a static array.
    pub fn after_index(&self) -> VarType {
        match &self.array {
            ArrayShape::Static(dims) if dims.len() > 1 => VarType {
                array: ArrayShape::Static(dims[1..].to_vec()),
                ..self.clone()
            },
            _ => self.element(),
        }
    }

    pub fn without_const(&self) -> VarType {
        VarType {
            is_const: false,
            ..self.clone()
        }
    }

    /// Size of one element.
    pub fn element_size(&self, types: &TypeTable) -> u32 {
        if self.pointer {
            POINTER_SIZE
        } else {
            self.base.size(types)
        }
    }

    /// Size in bytes of a variable of this type.
    pub fn size(&self, types: &TypeTable) -> u32 {
        match &self.array {
            ArrayShape::Scalar => self.element_size(types),
            ArrayShape::Dynamic => POINTER_SIZE,
            ArrayShape::Static(dims) => dims.iter().product::<u32>() * self.element_size(types),
        }
    }

    /// Whether this type is or contains managed handles that must be
    /// released when a variable of the type goes away.
    pub fn contains_dyn(&self, types: &TypeTable) -> bool {
        if self.is_dyn() || (self.pointer && self.is_static_array()) {
            return true;
        }
        match (self.base, self.pointer, &self.array) {
            (BaseType::Struct(id), false, ArrayShape::Scalar | ArrayShape::Static(_)) => {
                let mut current = types.struct_def(id);
                while let Some(def) = current {
                    if def.fields().any(|f| f.vartype.contains_dyn(types)) {
                        return true;
                    }
                    current = def.parent.and_then(|parent| types.struct_def(parent));
                }
                false
            }
            _ => false,
        }
    }

    /// Human readable spelling for diagnostics.
    pub fn display(&self, types: &TypeTable) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        out.push_str(&match self.base {
            BaseType::Void => "void".to_string(),
            BaseType::Char => "char".to_string(),
            BaseType::Short => "short".to_string(),
            BaseType::Int => "int".to_string(),
            BaseType::Long => "long".to_string(),
            BaseType::Float => "float".to_string(),
            BaseType::OldString => "string".to_string(),
            BaseType::Null => "null".to_string(),
            BaseType::Struct(id) | BaseType::Enum(id) => types.name(id).to_string(),
        });
        if self.pointer {
            out.push('*');
        }
        match &self.array {
            ArrayShape::Scalar => {}
            ArrayShape::Dynamic => out.push_str("[]"),
            ArrayShape::Static(dims) => {
                for dim in dims {
                    out.push_str(&format!("[{dim}]"));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Access, StructDef, TypeDef};

    fn table_with_struct(managed: bool) -> (TypeTable, TypeId) {
        let mut types = TypeTable::new();
        let mut def = StructDef::new("Point", managed);
        def.add_field("x", VarType::int(), 4, Access::Public);
        def.add_field("y", VarType::int(), 4, Access::Public);
        let id = types.add(TypeDef::Struct(def));
        (types, id)
    }

    #[test]
    fn sizes() {
        let (types, id) = table_with_struct(false);
        assert_eq!(VarType::new(BaseType::Char).size(&types), 1);
        assert_eq!(VarType::new(BaseType::Short).size(&types), 2);
        assert_eq!(VarType::float().size(&types), 4);
        assert_eq!(VarType::new(BaseType::OldString).size(&types), 200);
        assert_eq!(VarType::new(BaseType::Struct(id)).size(&types), 8);
        let arr = VarType::int().with_array(ArrayShape::Static(vec![2, 3]));
        assert_eq!(arr.size(&types), 24);
        assert_eq!(VarType::int().with_array(ArrayShape::Dynamic).size(&types), 4);
    }

    #[test]
    fn classification() {
        let (types, id) = table_with_struct(true);
        let p = VarType::pointer_to(id);
        assert!(p.is_dyn());
        assert!(p.is_pointer());
        assert!(!p.is_integer());
        assert!(VarType::new(BaseType::Enum(id)).is_integer());
        assert!(VarType::const_string().is_old_string());
        assert!(!VarType::const_string().is_string_struct(&types));
        assert!(p.with_array(ArrayShape::Dynamic).is_dynarray());
    }

    #[test]
    fn after_index_peels_one_dimension() {
        let arr = VarType::int().with_array(ArrayShape::Static(vec![2, 3]));
        assert_eq!(arr.after_index().array, ArrayShape::Static(vec![3]));
        assert_eq!(arr.after_index().after_index(), VarType::int());
    }

    #[test]
    fn display() {
        let (types, id) = table_with_struct(true);
        assert_eq!(VarType::pointer_to(id).display(&types), "Point*");
        assert_eq!(VarType::const_string().display(&types), "const string");
        let arr = VarType::float().with_array(ArrayShape::Static(vec![4]));
        assert_eq!(arr.display(&types), "float[4]");
        assert_eq!(VarType::int().with_array(ArrayShape::Dynamic).display(&types), "int[]");
    }

    #[test]
    fn structs_with_pointers_need_release() {
        let mut types = TypeTable::new();
        let managed = types.add(TypeDef::Struct(StructDef::new("Obj", true)));
        let mut holder = StructDef::new("Holder", false);
        holder.add_field("o", VarType::pointer_to(managed), 4, Access::Public);
        let holder = types.add(TypeDef::Struct(holder));
        assert!(VarType::new(BaseType::Struct(holder)).contains_dyn(&types));
        assert!(!VarType::int().contains_dyn(&types));
    }
}
