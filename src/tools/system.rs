//! `get_info`: clock and host information.

use async_trait::async_trait;

use super::literal::Literal;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};

/// `get_info(kind)` where kind is `time` (default), `date` or `os`.
#[derive(Debug, Default)]
pub struct GetInfoTool;

/// Operating system name and architecture, as shown to the model.
pub fn os_description() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

#[async_trait]
impl ToolHandler for GetInfoTool {
    fn description(&self) -> &str {
        "Devuelve la hora (time), la fecha (date) o el sistema operativo (os)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["kind"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let kind = arg_text(args, 0)
            .map(|k| k.trim().to_lowercase())
            .unwrap_or_else(|| "time".to_owned());
        let now = chrono::Local::now();
        let result = match kind.as_str() {
            "time" => ToolResult::success(
                tags::SYSTEM,
                format!("La hora actual es: {}", now.format("%H:%M:%S")),
            ),
            "date" => ToolResult::success(
                tags::SYSTEM,
                format!("La fecha de hoy es: {}", now.format("%d/%m/%Y")),
            ),
            "os" => ToolResult::success(
                tags::SYSTEM,
                format!("Información del sistema: {}", os_description()),
            ),
            other => ToolResult::failure(
                tags::CORE_ERROR,
                format!("Tipo de información '{other}' no soportado."),
            ),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    async fn run(args: &[Literal]) -> ToolResult {
        GetInfoTool.call(args, &ToolContext::default()).await.unwrap()
    }

    #[tokio::test]
    async fn time_is_default() {
        let out = run(&[]).await;
        assert!(out.success);
        assert!(out.output.starts_with("La hora actual es: "));
        assert_eq!(out.output.len(), "La hora actual es: ".len() + 8);
        assert_eq!(out.tag, tags::SYSTEM);
    }

    #[tokio::test]
    async fn date_and_os() {
        let date = run(&[Literal::Str("DATE".into())]).await;
        assert!(date.output.starts_with("La fecha de hoy es: "));
        let os = run(&[Literal::Str("os".into())]).await;
        assert!(os.output.contains(std::env::consts::OS));
    }

    #[tokio::test]
    async fn unknown_kind_fails() {
        let out = run(&[Literal::Str("clima".into())]).await;
        assert!(!out.success);
        assert_eq!(out.output, "Tipo de información 'clima' no soportado.");
    }
}
