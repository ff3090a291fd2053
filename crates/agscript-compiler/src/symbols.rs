//! The global symbol table.
//!
//! One name maps to one [`GlobalSymbol`]: a type, a function, a global
//! variable or a named constant. Struct members live in their
//! [`StructDef`](crate::types::StructDef) and are registered here a second
//! time under their qualified `Struct::name` when they are functions.
//! Local variables are kept separately in [`LocalScope`](crate::scope::LocalScope).

use rustc_hash::FxHashMap;

use crate::const_fold::ConstValue;
use crate::types::{FuncId, FunctionDef, TypeDef, TypeId, TypeTable, VarType};

/// Index of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

/// What a global name refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalSymbol {
    Type(TypeId),
    Function(FuncId),
    Variable(GlobalId),
    /// An enum member.
    Constant { value: i32, enum_type: TypeId },
}

impl GlobalSymbol {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GlobalSymbol::Type(_) => "type",
            GlobalSymbol::Function(_) => "function",
            GlobalSymbol::Variable(_) => "variable",
            GlobalSymbol::Constant { .. } => "constant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: String,
    pub vartype: VarType,
    /// Offset into global data; unused for imports.
    pub offset: u32,
    pub is_import: bool,
    pub readonly: bool,
    /// Value of a `readonly` global with a constant initialiser.
    pub const_value: Option<ConstValue>,
    pub line: u32,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub types: TypeTable,
    functions: Vec<FunctionDef>,
    globals: Vec<GlobalVar>,
    names: FxHashMap<String, GlobalSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<GlobalSymbol> {
        self.names.get(name).copied()
    }

    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        match self.find(name)? {
            GlobalSymbol::Type(id) => Some(id),
            _ => None,
        }
    }

    /// Register a type under its name. Fails if the name is taken.
    pub fn declare_type(&mut self, def: TypeDef) -> Result<TypeId, GlobalSymbol> {
        let name = def.name().to_string();
        if let Some(existing) = self.find(&name) {
            return Err(existing);
        }
        let id = self.types.add(def);
        self.names.insert(name, GlobalSymbol::Type(id));
        Ok(id)
    }

    /// Register a function under its (qualified) name, replacing any
    /// previous binding of the name.
    pub fn declare_function(&mut self, def: FunctionDef) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.names.insert(def.name.clone(), GlobalSymbol::Function(id));
        self.functions.push(def);
        id
    }

    pub fn declare_global(&mut self, var: GlobalVar) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.names.insert(var.name.clone(), GlobalSymbol::Variable(id));
        self.globals.push(var);
        id
    }

    pub fn declare_constant(&mut self, name: &str, value: i32, enum_type: TypeId) {
        self.names
            .insert(name.to_string(), GlobalSymbol::Constant { value, enum_type });
    }

    pub fn function(&self, id: FuncId) -> &FunctionDef {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut FunctionDef {
        &mut self.functions[id.0 as usize]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &FunctionDef)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId(i as u32), f))
    }

    pub fn global(&self, id: GlobalId) -> &GlobalVar {
        &self.globals[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumDef, StructDef};

    #[test]
    fn names_resolve_to_their_kind() {
        let mut table = SymbolTable::new();
        let ty = table
            .declare_type(TypeDef::Struct(StructDef::new("Obj", true)))
            .unwrap();
        let f = table.declare_function(FunctionDef::new("Run", VarType::void()));
        let g = table.declare_global(GlobalVar {
            name: "counter".into(),
            vartype: VarType::int(),
            offset: 0,
            is_import: false,
            readonly: false,
            const_value: None,
            line: 1,
        });

        assert_eq!(table.find_type("Obj"), Some(ty));
        assert_eq!(table.find("Run"), Some(GlobalSymbol::Function(f)));
        assert_eq!(table.find("counter"), Some(GlobalSymbol::Variable(g)));
        assert_eq!(table.global(g).name, "counter");
        assert!(table.find("missing").is_none());
    }

    #[test]
    fn type_names_cannot_be_reused() {
        let mut table = SymbolTable::new();
        table.declare_type(TypeDef::Enum(EnumDef { name: "bool".into() })).unwrap();
        let err = table
            .declare_type(TypeDef::Struct(StructDef::new("bool", false)))
            .unwrap_err();
        assert_eq!(err.kind_name(), "type");
    }

    #[test]
    fn enum_constants() {
        let mut table = SymbolTable::new();
        let ty = table.declare_type(TypeDef::Enum(EnumDef { name: "bool".into() })).unwrap();
        table.declare_constant("false", 0, ty);
        table.declare_constant("true", 1, ty);
        assert_eq!(
            table.find("true"),
            Some(GlobalSymbol::Constant { value: 1, enum_type: ty })
        );
    }
}
