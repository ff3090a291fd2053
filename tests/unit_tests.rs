//! Integration tests for the AGS script compiler.
//!
//! The first half compiles small inline programs and checks the exact code
//! that comes out. The second half compiles the complete scripts under
//! `test_scripts/` and checks the tables around the code.

use agscript::bytecode::{EXPORT_DATA, EXPORT_FUNCTION};
use agscript::{
    CompileError, CompileErrorKind, CompileOptions, CompiledScript, Diagnostics, FixupKind, Opcode, Section,
    compile, compile_sections,
};
use std::path::PathBuf;

/// Load a test script from the test_scripts directory.
fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

fn build(source: &str, options: CompileOptions) -> (CompiledScript, Diagnostics) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut diagnostics = Diagnostics::new();
    match compile(source, options, &mut diagnostics) {
        Ok(script) => (script, diagnostics),
        Err(err) => panic!("Failed to compile: {err}"),
    }
}

fn build_ok(source: &str) -> CompiledScript {
    build(source, CompileOptions::empty()).0
}

/// Helper to build one of the fixture scripts.
fn build_script(filename: &str) -> (CompiledScript, Diagnostics) {
    build(&load_script(filename), CompileOptions::empty())
}

fn build_err(source: &str) -> CompileError {
    let mut diagnostics = Diagnostics::new();
    match compile(source, CompileOptions::empty(), &mut diagnostics) {
        Ok(script) => panic!("Expected an error, got code {:?}", script.code),
        Err(err) => {
            assert!(diagnostics.has_errors());
            err
        }
    }
}

/// Split the code into instructions: (position, opcode, operands).
fn decode(code: &[i32]) -> Vec<(usize, Opcode, &[i32])> {
    let mut instructions = Vec::new();
    let mut pos = 0;
    while pos < code.len() {
        let op = Opcode::try_from(code[pos])
            .unwrap_or_else(|_| panic!("Word {} at {pos} is not an opcode", code[pos]));
        let end = pos + 1 + op.operand_count();
        instructions.push((pos, op, &code[pos + 1..end]));
        pos = end;
    }
    instructions
}

/// Where a jump instruction at `pos` with operand `offset` lands.
fn jump_target(pos: usize, offset: i32) -> usize {
    (pos as i32 + 2 + offset) as usize
}

fn jumps(code: &[i32], wanted: Opcode) -> Vec<(usize, usize)> {
    decode(code)
        .into_iter()
        .filter(|(_, op, _)| *op == wanted)
        .map(|(pos, _, args)| (pos, jump_target(pos, args[0])))
        .collect()
}

// =============================================================================
// Code generation
// =============================================================================

#[test]
fn test_empty_void_function() {
    let script = build_ok("void Foo() { return; }");
    assert_eq!(script.code, vec![38, 0, 5]);
    assert!(script.fixups.is_empty());
}

#[test]
fn test_return_literal() {
    let script = build_ok("int f() { return 5; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, 5, 5]);
    assert_eq!(script.code[4], 5);
}

#[test]
fn test_global_read_has_one_fixup() {
    let script = build_ok("int g; int f() { return g; }");
    assert_eq!(script.code, vec![38, 0, 6, 2, 0, 7, 3, 5]);
    assert_eq!(script.fixups.len(), 1);
    assert_eq!(script.fixups[0].offset, 4);
    assert_eq!(script.fixups[0].kind, FixupKind::GlobalData);
}

#[test]
fn test_locals_need_no_fixups() {
    let script = build_ok("int f() { int a = 1; int b = a + 2; return b; }");
    assert!(script.fixups.is_empty());
}

#[test]
fn test_if_else_layout() {
    let script = build_ok("int f(int a) { if (a) return 1; else return 2; }");
    assert_eq!(
        script.code,
        vec![38, 0, 51, 8, 7, 3, 28, 4, 6, 3, 1, 5, 6, 3, 2, 5]
    );
}

#[test]
fn test_if_else_has_one_jump_between_branches() {
    let script = build_ok("int g; void f(int a) { if (a) g = 1; else g = 2; }");
    let jz = jumps(&script.code, Opcode::Jz);
    let jmp = jumps(&script.code, Opcode::Jmp);
    assert_eq!(jz.len(), 1);
    assert_eq!(jmp.len(), 1);

    let (jz_pos, else_start) = jz[0];
    let (jmp_pos, end) = jmp[0];
    assert!(jz_pos < jmp_pos);
    // The condition jumps over the then-branch and its JMP.
    assert_eq!(else_start, jmp_pos + 2);
    // The JMP skips the else-branch and lands before the function end.
    assert_eq!(script.code[end], Opcode::Ret as i32);
}

#[test]
fn test_if_without_else_has_no_jmp() {
    let script = build_ok("int g; void f(int a) { if (a) g = 1; }");
    assert!(jumps(&script.code, Opcode::Jmp).is_empty());
    let jz = jumps(&script.code, Opcode::Jz);
    assert_eq!(jz.len(), 1);
    assert_eq!(script.code[jz[0].1], Opcode::Ret as i32);
}

#[test]
fn test_while_jumps_back_to_condition() {
    let script = build_ok("int f(int a) { while (a) a -= 1; return a; }");
    let jz = jumps(&script.code, Opcode::Jz);
    let jmp = jumps(&script.code, Opcode::Jmp);
    assert_eq!(jz.len(), 1);
    assert_eq!(jmp.len(), 1);
    // Back to the start of the condition, which follows THISBASE.
    assert_eq!(jmp[0].1, 2);
    assert_eq!(jz[0].1, jmp[0].0 + 2);
}

#[test]
fn test_constant_true_loop_has_no_test() {
    let script = build_ok("int g; void f() { while (1) { g += 1; if (g > 10) break; } }");
    assert_eq!(jumps(&script.code, Opcode::Jz).len(), 1, "only the 'if' tests");
}

#[test]
fn test_do_while_continue_goes_to_condition() {
    let script = build_ok("int g; void f() { do { g += 1; continue; } while (g < 3); }");
    let jnz = jumps(&script.code, Opcode::Jnz);
    let jmp = jumps(&script.code, Opcode::Jmp);
    assert_eq!(jnz.len(), 1);
    assert_eq!(jmp.len(), 1);
    // JNZ back to the body start, continue to just after itself.
    assert_eq!(jnz[0].1, 2);
    assert_eq!(jmp[0].1, jmp[0].0 + 2);
}

#[test]
fn test_for_loop_runs_iteration_after_body() {
    let script = build_ok("int g; void f() { for (int i = 0; i < 3; i++) g += i; }");
    let jmp = jumps(&script.code, Opcode::Jmp);
    let jz = jumps(&script.code, Opcode::Jz);
    assert_eq!(jmp.len(), 2);
    assert_eq!(jz.len(), 1);
    let (first, to_condition) = jmp[0];
    let (last, to_iteration) = jmp[1];
    // The first JMP skips the iteration clause, the last one returns to it.
    assert_eq!(to_iteration, first + 2);
    assert!(to_condition > to_iteration && to_condition < jz[0].0);
    assert_eq!(jz[0].1, last + 2);
}

#[test]
fn test_constant_folding() {
    let script = build_ok("int f() { return 2 + 3 * 4; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, 14, 5]);
}

#[test]
fn test_ternary_with_constant_condition() {
    let folded = build_ok("int f() { return 0 ? 10 : 20; }");
    let plain = build_ok("int f() { return 20; }");
    assert_eq!(folded.code, plain.code);
}

#[test]
fn test_dead_ternary_arm_leaves_no_trace() {
    let script = build_ok("import int Z(); int f() { return 1 ? 2 : Z(); } int Z() { return 3; }");
    assert!(script.imports.is_empty());
    assert!(script.fixups.is_empty());

    let script = build_ok(
        "import void Display(const string text, ...);\n\
         void f() { Display(0 ? \"gone\" : \"kept\"); }",
    );
    assert_eq!(script.strings, b"kept\0".to_vec());
}

#[test]
fn test_enum_values_count_from_one() {
    let script = build_ok("enum E { A, B = 5, C }; int f() { return A + C; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, 7, 5]);
}

#[test]
fn test_enum_counts_on_from_negative_value() {
    let script = build_ok("enum E { A, B = -3, C }; int f() { return C; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, -2, 5]);
}

#[test]
fn test_integer_literal_extremes() {
    let script = build_ok("int f() { return 2147483647; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, i32::MAX, 5]);
    let script = build_ok("int f() { return -2147483648; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, i32::MIN, 5]);
}

#[test]
fn test_readonly_global_is_a_constant() {
    let script = build_ok("readonly int Max = 7; int f() { return Max * 2; }");
    assert_eq!(script.code, vec![38, 0, 6, 3, 14, 5]);
    assert_eq!(script.globaldata, 7i32.to_le_bytes().to_vec());
}

#[test]
fn test_call_to_import_with_default_argument() {
    let script = build_ok("import int Add(int a, int b = 5); int f() { return Add(1); }");
    assert_eq!(
        script.code,
        vec![38, 0, 6, 3, 5, 34, 3, 6, 3, 1, 34, 3, 39, 2, 6, 3, 0, 33, 3, 35, 2, 5]
    );
    assert_eq!(script.imports, vec!["Add".to_string()]);
    assert_eq!(script.imports_with_sentinel(), vec!["Add", ""]);
    assert_eq!(script.fixups.len(), 1);
    assert_eq!(script.fixups[0].offset, 16);
    assert_eq!(script.fixups[0].kind, FixupKind::Import);
}

#[test]
fn test_unused_imports_are_not_listed() {
    let script = build_ok("import int Add(int a, int b); import int score; void f() { }");
    assert!(script.imports.is_empty());
}

#[test]
fn test_call_before_body_is_patched() {
    let script = build_ok("int g(); int f() { return g(); } int g() { return 7; }");
    let g_start = decode(&script.code)
        .into_iter()
        .find(|(pos, op, args)| *op == Opcode::ThisBase && *pos > 0 && args[0] == *pos as i32)
        .map(|(pos, _, _)| pos)
        .expect("g has a body");

    let calls: Vec<_> = script
        .fixups
        .iter()
        .filter(|f| f.kind == FixupKind::Function)
        .collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(script.code[calls[0].offset as usize], g_start as i32);
}

#[test]
fn test_new_managed_object() {
    let script = build_ok("managed struct Obj { int x; }; void f() { Obj *o = new Obj; }");
    assert_eq!(
        script.code,
        vec![38, 0, 73, 3, 4, 51, 0, 50, 3, 1, 1, 4, 51, 4, 49, 2, 1, 4, 5]
    );
}

#[test]
fn test_line_numbers() {
    let (script, _) = build("int f()\n{\n  return 1;\n}", CompileOptions::LINE_NUMBERS);
    assert_eq!(script.code, vec![38, 0, 36, 3, 6, 3, 1, 5]);
}

#[test]
fn test_string_literals_are_pooled() {
    let script = build_ok(
        "import void Display(const string text, ...);\n\
         void f() { Display(\"Hi\"); Display(\"Hi\"); Display(\"Bye\"); }",
    );
    assert_eq!(script.strings, b"Hi\0Bye\0".to_vec());
    let strings: Vec<i32> = script
        .fixups
        .iter()
        .filter(|f| f.kind == FixupKind::String)
        .map(|f| script.code[f.offset as usize])
        .collect();
    assert_eq!(strings, vec![0, 0, 3]);
    assert_eq!(script.imports, vec!["Display".to_string()]);
}

#[test]
fn test_fixups_are_ordered() {
    let script = build_ok(
        "int a; int b;\n\
         import void Display(const string text, ...);\n\
         void f() { a = b; Display(\"%d\", a); }",
    );
    let offsets: Vec<u32> = script.fixups.iter().map(|f| f.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);
}

// =============================================================================
// Switch
// =============================================================================

#[test]
fn test_switch_shared_case_body() {
    let script = build_ok(
        "int f(int a) { switch (a) { case 3: case 4: case 5: a = 1; break; } return a; }",
    );
    let instructions = decode(&script.code);
    let (regtoreg, ..) = instructions
        .iter()
        .find(|(_, op, _)| *op == Opcode::RegToReg)
        .copied()
        .expect("the switch value is moved to BX");
    // REGTOREG AX BX, then JMP to the comparisons: the body follows.
    let body = regtoreg + 5;

    let jnz = jumps(&script.code, Opcode::Jnz);
    assert_eq!(jnz.len(), 3);
    assert!(jnz.iter().all(|&(_, target)| target == body));

    let after_last_compare = jnz[2].0 + 2;
    let jmp = jumps(&script.code, Opcode::Jmp);
    assert!(jmp.iter().any(|&(_, target)| target == after_last_compare), "break leaves the switch");

    let compared: Vec<i32> = instructions
        .iter()
        .filter(|(pos, op, _)| *op == Opcode::LitToReg && *pos > body)
        .map(|(_, _, args)| args[1])
        .filter(|v| (3..=5).contains(v))
        .collect();
    assert_eq!(compared, vec![3, 4, 5]);
}

#[test]
fn test_switch_default_is_last_comparison() {
    let script = build_ok(
        "int g; void f(int a) { switch (a) { default: g = 0; break; case 1: g = 1; } }",
    );
    let jnz = jumps(&script.code, Opcode::Jnz);
    let jmp = jumps(&script.code, Opcode::Jmp);
    assert_eq!(jnz.len(), 1);
    // The JMP right after the only comparison goes to the default body.
    let (_, default_body) = jmp
        .iter()
        .copied()
        .find(|&(pos, _)| pos == jnz[0].0 + 2)
        .expect("a JMP to default follows the comparisons");
    assert!(default_body < jnz[0].1);
}

#[test]
fn test_switch_fallthrough_warning() {
    let (_, diagnostics) = build(
        "int g; void f(int a) { switch (a) { case 1: g = 2; case 2: g = 3; break; } }",
        CompileOptions::empty(),
    );
    let warnings: Vec<_> = diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("fall through"), "{}", warnings[0].message);
}

#[test]
fn test_fallthrough_keyword_silences_warning() {
    let (_, diagnostics) = build(
        "int g; void f(int a) { switch (a) { case 1: g = 2; fallthrough; case 2: g = 3; } }",
        CompileOptions::empty(),
    );
    assert!(!diagnostics.has_warnings());
}

#[test]
fn test_duplicate_case_is_an_error() {
    let err = build_err("void f(int a) { switch (a) { case 1: break; case 1: break; } }");
    assert!(err.message.contains("Duplicate case value '1'"), "{}", err.message);
}

#[test]
fn test_declaration_directly_in_switch_body() {
    let err = build_err("int f(int v) { switch (v) { case 1: int x = 5; break; case 2: return 9; } return 0; }");
    assert!(err.message.contains("declarations directly within a switch body"), "{}", err.message);
    assert_eq!(err.kind, CompileErrorKind::Semantic);

    let script = build_ok("int g; void f(int v) { switch (v) { case 1: { int x = 5; g = x; } break; } }");
    assert!(!script.code.is_empty());
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn test_unreachable_code_warning() {
    let (_, diagnostics) = build("int f() { return 1; return 2; }", CompileOptions::empty());
    assert_eq!(diagnostics.warning_count(), 1);
    let warning = diagnostics.warnings().next().expect("one warning");
    assert!(warning.message.contains("cannot reach"), "{}", warning.message);
}

#[test]
fn test_local_hiding_enum_value_warns() {
    let (script, diagnostics) = build("enum E { A }; int f() { int A = 3; return A; }", CompileOptions::empty());
    let warnings: Vec<_> = diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("'A'"), "{}", warnings[0].message);
    // The local wins: A is read from the stack, not folded to 1.
    assert!(!script.code.windows(3).any(|w| w == [6, 3, 1]));
}

#[test]
fn test_falling_off_non_void_function_warns() {
    let (_, diagnostics) = build("int f(int a) { if (a) return 1; }", CompileOptions::empty());
    let warnings: Vec<_> = diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("non-void function 'f'"), "{}", warnings[0].message);

    let (_, diagnostics) = build("void g() { } int h() { return 1; }", CompileOptions::empty());
    assert!(!diagnostics.has_warnings());
}

#[test]
fn test_protected_component_outside_struct() {
    let err = build_err(
        "struct S { protected int p; }; int f() { S s; return s.p; }",
    );
    assert_eq!(err.message, "Protected component 'p' must not be accessed from outside");
    assert_eq!(err.kind, CompileErrorKind::Semantic);
}

#[test]
fn test_writeprotected_component_outside_struct() {
    let err = build_err("struct S { writeprotected int w; }; void f() { S s; s.w = 5; }");
    assert_eq!(err.message, "Writeprotected component 'w' must not be modified from outside");
}

#[test]
fn test_protected_component_inside_member_function() {
    let (script, diagnostics) = build(
        "struct S { protected int p; writeprotected int w; int Get(); };\n\
         int S::Get() { this.w = 2; return this.p; }\n\
         int f() { S s; return s.w; }",
        CompileOptions::empty(),
    );
    assert!(!script.code.is_empty());
    assert!(!diagnostics.has_errors());
    assert!(!diagnostics.has_warnings(), "{:?}", diagnostics.warnings().collect::<Vec<_>>());
}

#[test]
fn test_access_qualifiers_are_exclusive() {
    for member in ["protected writeprotected int x;", "readonly protected int x;", "writeprotected readonly int x;"] {
        let err = build_err(&format!("struct S {{ {member} }};"));
        assert!(err.message.contains("Can only use one of"), "{member}: {}", err.message);
    }
}

#[test]
fn test_attribute_accessor_collisions() {
    let sources = [
        (
            "builtin managed struct ViewFrame { float get_Flipped; readonly import attribute int Flipped; };",
            "variable",
        ),
        (
            "builtin managed struct ViewFrame { readonly import attribute int Flipped; import int get_Flipped(); };",
            "function",
        ),
        (
            "builtin managed struct ViewFrame { import int get_Flipped(); readonly import attribute int Flipped; };",
            "function",
        ),
    ];
    for (source, kind) in sources {
        let err = build_err(source);
        assert_eq!(err.message, format!("'ViewFrame::get_Flipped' is already declared as a {kind}"));
    }
}

#[test]
fn test_non_managed_pointer_and_dynamic_array_name_the_member() {
    let err = build_err("struct P { int a; }; struct Q { P *p; };");
    assert!(err.message.contains("'p'"), "{}", err.message);
    assert!(err.message.contains("'P'"), "{}", err.message);

    let err = build_err("struct P { int a; }; struct Q { P arr[]; };");
    assert!(err.message.contains("'arr'"), "{}", err.message);

    let err = build_err("struct P { int a; }; void f() { P *local; }");
    assert!(err.message.contains("'local'"), "{}", err.message);
}

#[test]
fn test_signature_mismatch() {
    let err = build_err("import int Add(int a, int b); int Add(int a) { return a; }");
    assert!(err.message.contains("parameter"), "{}", err.message);
}

#[test]
fn test_default_mismatch() {
    let err = build_err("import int Add(int a, int b = 5); int Add(int a, int b = 6) { return a; }");
    assert!(err.message.contains("parameter #2"), "{}", err.message);
}

#[test]
fn test_import_override() {
    let script = build_ok("import int Twice(int a); int Twice(int a) { return a * 2; } int f() { return Twice(2); }");
    assert!(script.imports.is_empty());

    let mut diagnostics = Diagnostics::new();
    let err = compile(
        "import int Twice(int a); int Twice(int a) { return a * 2; }",
        CompileOptions::NO_IMPORT_OVERRIDE,
        &mut diagnostics,
    )
    .unwrap_err();
    assert!(err.message.contains("imported"), "{}", err.message);
}

#[test]
fn test_import_used_before_definition() {
    let err = build_err(
        "import int Twice(int a); int f() { return Twice(2); } int Twice(int a) { return a * 2; }",
    );
    assert!(err.message.contains("define it before using it"), "{}", err.message);
}

#[test]
fn test_function_without_body() {
    let err = build_err("int g(); int f() { return g(); }");
    assert!(err.message.contains("isn't defined with body nor imported"), "{}", err.message);
}

#[test]
fn test_missing_body_reports_declaring_section() {
    let mut diagnostics = Diagnostics::new();
    let err = compile_sections(
        &[
            Section::new("Header.ash", "\nint Roll();\n"),
            Section::new("Main.asc", "int f()\n{\n  return Roll();\n}\n"),
        ],
        CompileOptions::empty(),
        &mut diagnostics,
    )
    .unwrap_err();
    assert_eq!(err.section, "Header.ash");
    assert_eq!(err.line, 2);
}

#[test]
fn test_division_by_zero_names_operands() {
    let err = build_err("int f() { return 7 / 0; }");
    assert!(err.message.contains("'7 / 0'"), "{}", err.message);
    assert_eq!(err.line, 1);
}

#[test]
fn test_old_string_type_is_rejected() {
    let err = build_err("string name;");
    assert!(err.message.contains("use String instead"), "{}", err.message);

    let mut diagnostics = Diagnostics::new();
    let script = compile("string name = \"Roger\";", CompileOptions::OLD_STRINGS, &mut diagnostics).unwrap();
    assert_eq!(script.globaldata.len(), 200);
    assert_eq!(&script.globaldata[..6], b"Roger\0");
}

#[test]
fn test_break_outside_loop() {
    let err = build_err("void f() { break; }");
    assert_eq!(err.kind, CompileErrorKind::Semantic);
    assert!(err.message.contains("'break'"), "{}", err.message);
}

// =============================================================================
// Sections and exports
// =============================================================================

#[test]
fn test_sections_report_their_own_lines() {
    let header = "import void Display(const string text, ...);\n";
    let main = "void f()\n{\n  x = 5;\n}\n";
    let mut diagnostics = Diagnostics::new();
    let err = compile_sections(
        &[Section::new("GlobalScript.ash", header), Section::new("room1.asc", main)],
        CompileOptions::empty(),
        &mut diagnostics,
    )
    .unwrap_err();
    assert_eq!(err.section, "room1.asc");
    assert_eq!(err.line, 3);
    let recorded = diagnostics.errors().next().expect("error is recorded");
    assert_eq!(recorded.section, "room1.asc");
}

#[test]
fn test_sections_are_listed() {
    let mut diagnostics = Diagnostics::new();
    let script = compile_sections(
        &[
            Section::new("Header.ash", "import int Random(int max);\n"),
            Section::new("Main.asc", "int Roll() { return Random(6) + 1; }\n"),
        ],
        CompileOptions::empty(),
        &mut diagnostics,
    )
    .unwrap();
    let names: Vec<&str> = script.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Header.ash", "Main.asc"]);
    assert_eq!(script.sections[1].code_offset, 0);
}

#[test]
fn test_export_all() {
    let (script, _) = build("int f() { return 1; } void g() { }", CompileOptions::EXPORT_ALL);
    let names: Vec<&str> = script.exports.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["f$0", "g$0"]);
    assert_eq!(script.exports[0].offset(), 0);
    assert_eq!(script.exports[0].tag(), EXPORT_FUNCTION);
    assert_eq!(script.exports[1].offset(), 6);
}

#[test]
fn test_export_unknown_name() {
    let err = build_err("export missing;");
    assert!(err.message.contains("'missing'"), "{}", err.message);
}

// =============================================================================
// Fixture scripts
// =============================================================================

#[test]
fn test_globals_and_enums() {
    let (script, diagnostics) = build_script("globals.as");
    assert!(!diagnostics.has_warnings());
    // MaxLives, lives, speed, counters[4] of short, initial
    assert_eq!(script.globaldata.len(), 4 + 4 + 4 + 8 + 1);
    assert_eq!(&script.globaldata[..4], &3i32.to_le_bytes());
    assert_eq!(&script.globaldata[4..8], &3i32.to_le_bytes());
    assert_eq!(&script.globaldata[8..12], &1.5f32.to_le_bytes());
    assert_eq!(script.globaldata[20], b'A');
    assert!(decode(&script.code).iter().any(|(_, op, _)| *op == Opcode::CheckBounds));
}

#[test]
fn test_control_flow() {
    let (script, diagnostics) = build_script("control_flow.as");
    assert!(!diagnostics.has_warnings(), "{:?}", diagnostics.warnings().collect::<Vec<_>>());
    let instructions = decode(&script.code);
    let functions = instructions.iter().filter(|(_, op, _)| *op == Opcode::ThisBase).count();
    assert_eq!(functions, 3);
    assert!(script.fixups.iter().all(|f| f.kind == FixupKind::GlobalData));
}

#[test]
fn test_structs() {
    let (script, _) = build_script("structs.as");
    assert!(script.imports.contains(&"Item::Create^1".to_string()));
    assert!(script.imports.contains(&"Item::set_Price^1".to_string()));
    assert!(script.imports.contains(&"Item::get_Rarity^0".to_string()));
    let instructions = decode(&script.code);
    assert!(instructions.iter().any(|(_, op, _)| *op == Opcode::NewArray));
    assert!(instructions.iter().any(|(_, op, _)| *op == Opcode::CallObj));
    assert!(instructions.iter().any(|(_, op, _)| *op == Opcode::MemZeroPtr));
}

#[test]
fn test_strings() {
    let (script, _) = build_script("strings.as");
    assert!(script.imports.contains(&"String::Format^101".to_string()));
    assert!(script.imports.contains(&"Display".to_string()));
    let instructions = decode(&script.code);
    assert!(instructions.iter().any(|(_, op, _)| *op == Opcode::StringsEqual));
    assert!(instructions.iter().any(|(_, op, _)| *op == Opcode::CreateString));
    let pool = String::from_utf8_lossy(&script.strings);
    assert!(pool.contains("Hello, %s"));
    assert!(pool.contains("Ego"));
}

#[test]
fn test_imports_and_exports() {
    let (script, _) = build_script("imports_exports.as");
    assert_eq!(script.imports, vec!["GetGameSpeed".to_string(), "score".to_string()]);

    let exports: Vec<(&str, u32)> = script.exports.iter().map(|e| (e.name.as_str(), e.tag())).collect();
    assert_eq!(exports, vec![("lastSpeed", EXPORT_DATA), ("Helper$1", EXPORT_FUNCTION)]);
    assert_eq!(script.exports[0].offset(), 0);
}

#[test]
fn test_disassembly_names_instructions() {
    let (script, _) = build_script("control_flow.as");
    let listing = script.disassemble();
    assert!(listing.contains("thisaddr"), "{listing}");
    assert!(listing.contains("ret"), "{listing}");
}
