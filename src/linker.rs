use log::info;

use crate::error::TranslateError;
use crate::parser;
use crate::translator::Translator;

/// One translation unit: a module name (for static namespacing) and its
/// VM source text.
pub struct Unit {
    pub name: String,
    pub source: String,
}

/// Concatenate the units into one program: bootstrap first, then each unit's
/// commands in order, all sharing a single translation context so minted
/// labels never repeat across units.
pub fn link(units: &[Unit]) -> Result<Vec<String>, TranslateError> {
    if units.is_empty() {
        return Err(TranslateError::EmptyProgram);
    }

    let mut translator = Translator::new();
    let mut program = translator.bootstrap()?;

    for unit in units {
        let commands = parser::parse(&unit.source)?;
        info!("linking {} ({} commands)", unit.name, commands.len());
        translator.set_module(&unit.name);
        program.extend(translator.translate(&commands)?);
    }

    Ok(program)
}
