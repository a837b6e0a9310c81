use crate::context::{GlobalArgs, Session};
use deployenv_core::Result;
use deployenv_env::VariableSources;

pub async fn execute(global: &GlobalArgs, expression: &str) -> Result<()> {
    let session = Session::open(global, global.plugin_options())?;

    let mut sources =
        VariableSources::with_host_sources(global.option_values(session.plugin.stage().as_str()));
    session.plugin.register_variable_sources(&mut sources);

    let value = if expression.contains("${") {
        sources.interpolate(expression).await?
    } else {
        sources.resolve(expression).await?
    };
    println!("{value}");
    Ok(())
}
