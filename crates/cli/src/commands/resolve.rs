use super::hook::emit;
use super::OutputFormat;
use crate::context::{GlobalArgs, Session};
use deployenv_config::FileFormat;
use deployenv_core::{EnvironmentVariables, Result, ScopeSelection};

pub async fn execute(global: &GlobalArgs, format: OutputFormat, variables: bool) -> Result<()> {
    let options = global.plugin_options();
    let selection = options.deploy_scopes.clone();
    let session = Session::initialized(global, options).await?;

    let env = if variables {
        session.plugin.variables()?.flatten(&ScopeSelection::All)
    } else {
        session.plugin.environment()?.flatten(&selection)
    };

    emit(&render(&env, format)?);
    Ok(())
}

pub fn render(env: &EnvironmentVariables, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Dotenv => Ok(env
            .iter()
            .map(|(key, value)| format!("{key}={}\n", shell_words::quote(value)))
            .collect()),
        OutputFormat::Json => FileFormat::Json.render(env),
        OutputFormat::Yaml => FileFormat::Yaml.render(env),
    }
}
