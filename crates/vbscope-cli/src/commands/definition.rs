//! Definition command - shows where the name at a position is declared

use anyhow::Result;
use clap::Args;
use vbscope_core::Position;

use super::{PositionArgs, find_document, load_project};
use crate::output::pretty::PrettyFormatter;

#[derive(Args, Debug)]
pub struct DefinitionArgs {
    #[command(flatten)]
    pub query: PositionArgs,
}

impl DefinitionArgs {
    pub fn run(&self) -> Result<()> {
        let loaded = load_project(&self.query.path)?;
        let uri = find_document(&loaded.project, &self.query.document)?;
        let position = Position::new(self.query.line, self.query.character);

        let links = loaded.project.go_to_definition(&uri, position)?;

        match self.query.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&links)?),
            _ => print!("{}", PrettyFormatter::new().format_definitions(&links)),
        }

        Ok(())
    }
}
