use crate::commands::{hook, resolve, run, variable, Commands};
use crate::context::GlobalArgs;
use deployenv_core::Result;

impl Commands {
    pub async fn execute(self, global: &GlobalArgs) -> Result<()> {
        match self {
            Commands::RunWithEnvironment {
                command,
                stage,
                args,
            } => run::execute(global, command, stage, args).await,
            Commands::Hook {
                phase,
                write,
                output,
                command,
                args,
            } => hook::execute(global, &phase, write, output, command, args).await,
            Commands::Hooks => {
                hook::list();
                Ok(())
            }
            Commands::Resolve { format, variables } => {
                resolve::execute(global, format, variables).await
            }
            Commands::Variable { expression } => variable::execute(global, &expression).await,
        }
    }
}
