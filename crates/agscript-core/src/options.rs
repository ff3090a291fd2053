//! Compile options.

use bitflags::bitflags;

bitflags! {
    /// Flags that steer one compilation.
    ///
    /// The bit values are those the editor and engine already store in
    /// project files, so they are kept stable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompileOptions: u32 {
        /// Export every function that has a body.
        const EXPORT_ALL = 0x01;
        /// Also log warnings through `log::warn!`.
        const SHOW_WARNINGS = 0x02;
        /// Emit `LINENUM` instructions and fill the line table.
        const LINE_NUMBERS = 0x04;
        /// Accepted for compatibility; the compiler does not act on it.
        const AUTO_EXPORT = 0x08;
        /// A function that has been imported may not be redefined locally.
        const NO_IMPORT_OVERRIDE = 0x20;
        /// Operators of equal priority group left-to-right.
        const LEFT_TO_RIGHT = 0x40;
        /// Allow the legacy fixed-buffer `string` type.
        const OLD_STRINGS = 0x80;
    }
}

impl CompileOptions {
    /// The options the editor uses for new projects.
    pub fn recommended() -> Self {
        CompileOptions::LINE_NUMBERS | CompileOptions::LEFT_TO_RIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_are_stable() {
        assert_eq!(CompileOptions::EXPORT_ALL.bits(), 0x01);
        assert_eq!(CompileOptions::SHOW_WARNINGS.bits(), 0x02);
        assert_eq!(CompileOptions::LINE_NUMBERS.bits(), 0x04);
        assert_eq!(CompileOptions::AUTO_EXPORT.bits(), 0x08);
        assert_eq!(CompileOptions::NO_IMPORT_OVERRIDE.bits(), 0x20);
        assert_eq!(CompileOptions::LEFT_TO_RIGHT.bits(), 0x40);
        assert_eq!(CompileOptions::OLD_STRINGS.bits(), 0x80);
    }

    #[test]
    fn default_is_empty() {
        assert!(CompileOptions::default().is_empty());
        assert!(CompileOptions::recommended().contains(CompileOptions::LEFT_TO_RIGHT));
    }
}
