//! List command handler.

use color_eyre::Result;

use crate::migrations::create_register;

use super::App;

impl App {
    /// Print every registered step with its description.
    pub fn run_list(&self) -> Result<()> {
        let register = create_register();
        let width = register.iter().map(|s| s.id().len()).max().unwrap_or(0);
        for step in register.iter() {
            println!("{:<width$}  {}", step.id(), step.description(), width = width);
        }
        Ok(())
    }
}
