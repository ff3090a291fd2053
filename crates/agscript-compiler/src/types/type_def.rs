//! Struct and enum definitions.

use rustc_hash::FxHashMap;

use super::{FuncId, TypeId, VarType};

/// A user defined type.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Struct(StructDef),
    Enum(EnumDef),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Struct(s) => &s.name,
            TypeDef::Enum(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
}

/// Who may read and write a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    /// Only the struct's own member functions may use it.
    Protected,
    /// Readable by everyone, writable only by the struct's own functions.
    WriteProtected,
    /// Nobody may write it.
    ReadOnly,
}

/// A data member.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub vartype: VarType,
    pub offset: u32,
    pub access: Access,
}

/// A property implemented by getter and setter functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub vartype: VarType,
    /// `attribute int X[]`: accessed through `geti_X`/`seti_X`.
    pub indexed: bool,
    pub is_static: bool,
    pub getter: FuncId,
    /// `None` for `readonly` attributes.
    pub setter: Option<FuncId>,
}

/// Anything that can follow `.` on a struct.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Field(Field),
    Function(FuncId),
    Attribute(Attribute),
}

impl Component {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Component::Field(_) => "variable",
            Component::Function(_) => "function",
            Component::Attribute(_) => "attribute",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub managed: bool,
    pub builtin: bool,
    /// Variables of this type are implicitly pointers.
    pub autoptr: bool,
    /// This is the reference counted `String` type.
    pub internalstring: bool,
    pub parent: Option<TypeId>,
    /// Bytes taken by the fields, including the parent's.
    pub size: u32,
    /// Whether the body `{ ... }` has been seen (forward declarations
    /// do not have one yet).
    pub defined: bool,
    components: Vec<Component>,
    index: FxHashMap<String, usize>,
}

impl StructDef {
    pub fn new(name: impl Into<String>, managed: bool) -> Self {
        Self {
            name: name.into(),
            managed,
            builtin: false,
            autoptr: false,
            internalstring: false,
            parent: None,
            size: 0,
            defined: false,
            components: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Components declared in this struct itself, in declaration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Look up a component declared in this struct itself.
    pub fn own_component(&self, name: &str) -> Option<&Component> {
        self.index.get(name).map(|&i| &self.components[i])
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.components.iter().filter_map(|c| match c {
            Component::Field(f) => Some(f),
            _ => None,
        })
    }

    /// Append a data member after the current end and return its offset.
    pub fn add_field(&mut self, name: &str, vartype: VarType, size: u32, access: Access) -> u32 {
        let offset = self.size;
        self.size += size;
        self.push(
            name,
            Component::Field(Field {
                name: name.to_string(),
                vartype,
                offset,
                access,
            }),
        );
        offset
    }

    pub fn add_function(&mut self, name: &str, id: FuncId) {
        self.push(name, Component::Function(id));
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        let name = attribute.name.clone();
        self.push(&name, Component::Attribute(attribute));
    }

    fn push(&mut self, name: &str, component: Component) {
        self.index.insert(name.to_string(), self.components.len());
        self.components.push(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_laid_out_in_order() {
        let mut def = StructDef::new("S", false);
        assert_eq!(def.add_field("a", VarType::int(), 4, Access::Public), 0);
        assert_eq!(def.add_field("b", VarType::int(), 4, Access::Protected), 4);
        assert_eq!(def.size, 8);
        let Some(Component::Field(b)) = def.own_component("b") else {
            panic!("b is a field");
        };
        assert_eq!(b.offset, 4);
        assert_eq!(b.access, Access::Protected);
        assert_eq!(def.fields().count(), 2);
    }

    #[test]
    fn functions_and_attributes_take_no_space() {
        let mut def = StructDef::new("S", true);
        def.add_function("Run", FuncId(0));
        def.add_attribute(Attribute {
            name: "X".into(),
            vartype: VarType::int(),
            indexed: false,
            is_static: false,
            getter: FuncId(1),
            setter: Some(FuncId(2)),
        });
        assert_eq!(def.size, 0);
        assert_eq!(def.own_component("Run").map(Component::kind_name), Some("function"));
        assert_eq!(def.own_component("X").map(Component::kind_name), Some("attribute"));
        assert!(def.own_component("Y").is_none());
    }
}
