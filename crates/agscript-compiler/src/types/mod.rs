//! Core type definitions for the compiler.

mod function_def;
mod type_def;
mod vartype;

pub use function_def::{FunctionDef, Param, ParamDefault};
pub use type_def::{Access, Attribute, Component, EnumDef, Field, StructDef, TypeDef};
pub use vartype::{ArrayShape, BaseType, VarType};

/// Index of a struct or enum in the [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Index of a function in the symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

/// All user defined types of one compilation.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    defs: Vec<TypeDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId(self.defs.len() as u32);
        self.defs.push(def);
        id
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.get(id).map_or("?", TypeDef::name)
    }

    pub fn struct_def(&self, id: TypeId) -> Option<&StructDef> {
        match self.get(id)? {
            TypeDef::Struct(s) => Some(s),
            TypeDef::Enum(_) => None,
        }
    }

    pub fn struct_def_mut(&mut self, id: TypeId) -> Option<&mut StructDef> {
        match self.defs.get_mut(id.0 as usize)? {
            TypeDef::Struct(s) => Some(s),
            TypeDef::Enum(_) => None,
        }
    }

    /// Find a component in `id` or the structs it extends, nearest first.
    /// Returns the struct that declares it alongside.
    pub fn find_component(&self, id: TypeId, name: &str) -> Option<(TypeId, &Component)> {
        let mut current = Some(id);
        while let Some(sid) = current {
            let def = self.struct_def(sid)?;
            if let Some(component) = def.own_component(name) {
                return Some((sid, component));
            }
            current = def.parent;
        }
        None
    }

    /// Whether `derived` is `base` or extends it, directly or indirectly.
    pub fn is_same_or_derived(&self, derived: TypeId, base: TypeId) -> bool {
        let mut current = Some(derived);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            current = self.struct_def(id).and_then(|s| s.parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_are_inherited() {
        let mut types = TypeTable::new();
        let mut base = StructDef::new("Base", true);
        base.add_field("id", VarType::int(), 4, Access::Public);
        let base = types.add(TypeDef::Struct(base));

        let mut derived = StructDef::new("Derived", true);
        derived.parent = Some(base);
        derived.size = 4;
        derived.add_field("extra", VarType::int(), 4, Access::Public);
        let derived = types.add(TypeDef::Struct(derived));

        let (owner, component) = types.find_component(derived, "id").unwrap();
        assert_eq!(owner, base);
        assert!(matches!(component, Component::Field(f) if f.offset == 0));
        let (owner, _) = types.find_component(derived, "extra").unwrap();
        assert_eq!(owner, derived);
        assert!(types.find_component(base, "extra").is_none());

        assert!(types.is_same_or_derived(derived, base));
        assert!(!types.is_same_or_derived(base, derived));
    }

    #[test]
    fn enums_are_not_structs() {
        let mut types = TypeTable::new();
        let id = types.add(TypeDef::Enum(EnumDef { name: "bool".into() }));
        assert_eq!(types.name(id), "bool");
        assert!(types.struct_def(id).is_none());
    }
}
