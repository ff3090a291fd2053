//! Function signatures.

use super::{TypeId, TypeTable, VarType};

/// A literal a parameter falls back to when a call omits it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    Int(i32),
    Float(f32),
    Null,
    Str(Vec<u8>),
}

impl ParamDefault {
    pub fn display(&self) -> String {
        match self {
            ParamDefault::Int(v) => v.to_string(),
            ParamDefault::Float(v) => format!("{v:?}"),
            ParamDefault::Null => "null".to_string(),
            ParamDefault::Str(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub vartype: VarType,
    pub default: Option<ParamDefault>,
}

/// A declared function: global, struct member or extender.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// `Name` or `Struct::Name`.
    pub name: String,
    pub struct_of: Option<TypeId>,
    pub is_static: bool,
    pub is_protected: bool,
    pub return_type: VarType,
    pub params: Vec<Param>,
    pub variadic: bool,
    pub noloopcheck: bool,
    /// Declared with `import`; calls go through the import table until a
    /// body overrides it.
    pub is_import: bool,
    pub has_body: bool,
    pub code_offset: Option<u32>,
    /// Line of the first declaration, for "declared elsewhere" messages.
    pub line: u32,
    pub section: u16,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, return_type: VarType) -> Self {
        Self {
            name: name.into(),
            struct_of: None,
            is_static: false,
            is_protected: false,
            return_type,
            params: Vec::new(),
            variadic: false,
            noloopcheck: false,
            is_import: false,
            has_body: false,
            code_offset: None,
            line: 0,
            section: 0,
        }
    }

    /// Non-static member function; calls need an object.
    pub fn needs_object(&self) -> bool {
        self.struct_of.is_some() && !self.is_static
    }

    /// Name without the `Struct::` prefix.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Name in the import table: `Struct::Method^N` for members, where `N`
    /// counts 100 extra for variadic functions.
    pub fn import_symbol(&self) -> String {
        if self.struct_of.is_some() {
            let arity = self.params.len() + if self.variadic { 100 } else { 0 };
            format!("{}^{}", self.name, arity)
        } else {
            self.name.clone()
        }
    }

    /// Name in the export table: `name$argcount`.
    pub fn export_symbol(&self) -> String {
        format!("{}${}", self.name, self.params.len())
    }

    /// Number of leading parameters without defaults.
    pub fn required_params(&self) -> usize {
        self.params.iter().rposition(|p| p.default.is_none()).map_or(0, |i| i + 1)
    }

    /// Check that `other`, another declaration of the same function, agrees
    /// with this one. The message describes the first difference.
    pub fn check_same_signature(&self, other: &FunctionDef, types: &TypeTable) -> Result<(), String> {
        let name = &self.name;
        if self.params.len() != other.params.len() || self.variadic != other.variadic {
            return Err(format!(
                "Function '{name}' is declared with {} parameter(s) here but with {} parameter(s) on line {}",
                other.params.len(),
                self.params.len(),
                self.line
            ));
        }
        if self.return_type != other.return_type {
            return Err(format!(
                "Return type of '{name}' is '{}' here but '{}' on line {}",
                other.return_type.display(types),
                self.return_type.display(types),
                self.line
            ));
        }
        if self.is_static != other.is_static {
            return Err(format!(
                "Function '{name}' is declared as {} here but as {} on line {}",
                if other.is_static { "static" } else { "non-static" },
                if self.is_static { "static" } else { "non-static" },
                self.line
            ));
        }
        for (idx, (mine, theirs)) in self.params.iter().zip(&other.params).enumerate() {
            let number = idx + 1;
            if mine.vartype != theirs.vartype {
                return Err(format!(
                    "Type of parameter #{number} of '{name}' is '{}' here but '{}' on line {}",
                    theirs.vartype.display(types),
                    mine.vartype.display(types),
                    self.line
                ));
            }
            if mine.default != theirs.default {
                let show = |d: &Option<ParamDefault>| match d {
                    Some(d) => format!("the default {}", d.display()),
                    None => "no default".to_string(),
                };
                return Err(format!(
                    "In '{name}', parameter #{number} has {} here but {} on line {}",
                    show(&theirs.default),
                    show(&mine.default),
                    self.line
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(params: &[Option<ParamDefault>]) -> FunctionDef {
        let mut f = FunctionDef::new("Move", VarType::void());
        f.line = 3;
        f.params = params
            .iter()
            .map(|d| Param {
                name: None,
                vartype: VarType::int(),
                default: d.clone(),
            })
            .collect();
        f
    }

    #[test]
    fn import_and_export_names() {
        let mut f = func(&[None, None]);
        assert_eq!(f.import_symbol(), "Move");
        assert_eq!(f.export_symbol(), "Move$2");

        f.name = "Character::Walk".into();
        f.struct_of = Some(TypeId(0));
        assert_eq!(f.import_symbol(), "Character::Walk^2");
        assert_eq!(f.short_name(), "Walk");
        f.variadic = true;
        assert_eq!(f.import_symbol(), "Character::Walk^102");
    }

    #[test]
    fn required_params_stop_at_last_without_default() {
        assert_eq!(func(&[None, Some(ParamDefault::Int(5))]).required_params(), 1);
        assert_eq!(func(&[Some(ParamDefault::Int(1))]).required_params(), 0);
        assert_eq!(func(&[None, None]).required_params(), 2);
    }

    #[test]
    fn signature_mismatches_mention_parameter() {
        let types = TypeTable::new();
        let declared = func(&[None, Some(ParamDefault::Int(5))]);

        let fewer = func(&[None]);
        let err = declared.check_same_signature(&fewer, &types).unwrap_err();
        assert!(err.contains("parameter"), "{err}");

        let other_default = func(&[None, Some(ParamDefault::Int(6))]);
        let err = declared.check_same_signature(&other_default, &types).unwrap_err();
        assert!(err.contains("parameter #2"), "{err}");
        assert!(err.contains("the default 6 here but the default 5"), "{err}");

        let same = func(&[None, Some(ParamDefault::Int(5))]);
        assert!(declared.check_same_signature(&same, &types).is_ok());
    }
}
