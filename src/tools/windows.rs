//! `window_manager`: list, focus, minimize and close desktop windows
//! through `wmctrl` (X11).

use std::time::Duration;

use async_trait::async_trait;

use super::literal::Literal;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};
use crate::exec::{CommandOutput, ExecError, run_command};

const DEFAULT_BINARY: &str = "wmctrl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowAction {
    List,
    Focus,
    Minimize,
    Close,
}

impl WindowAction {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "list" => Some(Self::List),
            "focus" => Some(Self::Focus),
            "minimize" => Some(Self::Minimize),
            "close" => Some(Self::Close),
            _ => None,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::List => "listar",
            Self::Focus => "enfocar",
            Self::Minimize => "minimizar",
            Self::Close => "cerrar",
        }
    }
}

/// Window titles from `wmctrl -l` output.
pub fn parse_window_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            // id, desktop, host, title
            let title = line.split_whitespace().skip(3).collect::<Vec<_>>().join(" ");
            (!title.is_empty()).then_some(title)
        })
        .collect()
}

/// First window id whose `wmctrl -l` line contains `target`, ignoring case.
pub fn find_window_id(stdout: &str, target: &str) -> Option<String> {
    let needle = target.to_lowercase();
    stdout
        .lines()
        .find(|line| line.to_lowercase().contains(&needle))
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_owned)
}

/// `window_manager(action, target)`.
#[derive(Debug, Clone)]
pub struct WindowManagerTool {
    binary: String,
    timeout: Duration,
}

impl WindowManagerTool {
    /// Manage windows with `wmctrl`, giving each call `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary(DEFAULT_BINARY, timeout)
    }

    /// Use a different `wmctrl`-compatible binary.
    pub fn with_binary(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn wmctrl(&self, args: &[&str]) -> Result<CommandOutput, ExecError> {
        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        run_command(&self.binary, &args, self.timeout, None).await
    }

    async fn run(&self, action: WindowAction, target: Option<&str>) -> Result<ToolResult, ExecError> {
        let window = |msg: String| ToolResult::failure(tags::WINDOWS, msg);

        if action == WindowAction::List {
            let out = self.wmctrl(&["-l"]).await?;
            if !out.success() {
                return Ok(window(format!(
                    "Error listando ventanas: {}",
                    out.stderr_text().trim()
                )));
            }
            let titles = parse_window_list(&out.stdout_text());
            if titles.is_empty() {
                return Ok(ToolResult::success(tags::WINDOWS, "No hay ventanas abiertas."));
            }
            let lines: Vec<String> = titles.iter().map(|t| format!(" - {t}")).collect();
            return Ok(ToolResult::success(
                tags::WINDOWS,
                format!("Ventanas abiertas:\n{}", lines.join("\n")),
            ));
        }

        let Some(target) = target else {
            return Ok(window(format!(
                "Falta el nombre de la ventana para {}.",
                action.verb()
            )));
        };

        match action {
            WindowAction::Focus => {
                let out = self.wmctrl(&["-a", target]).await?;
                if !out.success() {
                    return Ok(window(format!(
                        "No encontré una ventana con '{target}'. Usá 'list' para ver las ventanas disponibles."
                    )));
                }
                Ok(ToolResult::success(
                    tags::WINDOWS,
                    format!("Ventana '{target}' traída al frente."),
                ))
            }
            WindowAction::Minimize => {
                let listing = self.wmctrl(&["-l"]).await?;
                let Some(id) = find_window_id(&listing.stdout_text(), target) else {
                    return Ok(window(format!("No encontré ventana '{target}'")));
                };
                self.wmctrl(&["-i", "-r", &id, "-b", "add,hidden"]).await?;
                Ok(ToolResult::success(
                    tags::WINDOWS,
                    format!("Ventana '{target}' minimizada."),
                ))
            }
            WindowAction::Close => {
                let out = self.wmctrl(&["-c", target]).await?;
                if !out.success() {
                    return Ok(window(format!(
                        "No encontré ventana '{target}' para cerrar."
                    )));
                }
                Ok(ToolResult::success(
                    tags::WINDOWS,
                    format!("Ventana '{target}' cerrada."),
                ))
            }
            WindowAction::List => Ok(window("Acción inválida.".into())),
        }
    }
}

#[async_trait]
impl ToolHandler for WindowManagerTool {
    fn description(&self) -> &str {
        "Gestiona ventanas del escritorio: list, focus, minimize, close"
    }

    fn parameters(&self) -> &[&'static str] {
        &["action", "target"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(action_text) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(
                tags::WINDOWS,
                "Falta la acción. Acciones disponibles: list, focus, minimize, close",
            ));
        };
        let action_text = action_text.trim().to_lowercase();
        let Some(action) = WindowAction::parse(&action_text) else {
            return Ok(ToolResult::failure(
                tags::WINDOWS,
                format!("Acción desconocida: {action_text}. Usa: list, focus, minimize, close"),
            ));
        };
        let target = arg_text(args, 1).map(|t| t.trim().to_owned());

        if which::which(&self.binary).is_err() {
            return Ok(ToolResult::failure(
                tags::WINDOWS,
                "wmctrl no está instalado. Instalá con: sudo apt install wmctrl",
            ));
        }

        tracing::info!(action = %action_text, target = ?target, "window manager");
        match self.run(action, target.as_deref()).await {
            Ok(result) => Ok(result),
            Err(ExecError::Timeout { .. }) => Ok(ToolResult::failure(
                tags::WINDOWS,
                "Timeout gestionando ventanas.",
            )),
            Err(e) => {
                tracing::error!(error = %e, "window manager failed");
                Ok(ToolResult::failure(
                    tags::WINDOWS,
                    format!("Error en window manager: {e}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const LISTING: &str = "0x03e00003  0 host Terminal - bash\n0x04a00007  0 host Mozilla Firefox\n";

    #[test]
    fn list_parsing_keeps_full_titles() {
        assert_eq!(
            parse_window_list(LISTING),
            vec!["Terminal - bash", "Mozilla Firefox"]
        );
        assert!(parse_window_list("").is_empty());
    }

    #[test]
    fn window_id_by_partial_title() {
        assert_eq!(find_window_id(LISTING, "firefox").as_deref(), Some("0x04a00007"));
        assert_eq!(find_window_id(LISTING, "gimp"), None);
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let tool = WindowManagerTool::new(Duration::from_secs(1));
        let out = tool
            .call(&[Literal::Str("Explode".into())], &ToolContext::default())
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(
            out.output,
            "Acción desconocida: explode. Usa: list, focus, minimize, close"
        );
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let tool = WindowManagerTool::with_binary("no-such-wmctrl-xyz", Duration::from_secs(1));
        let out = tool
            .call(&[Literal::Str("list".into())], &ToolContext::default())
            .await
            .unwrap();
        assert!(!out.success);
        assert!(out.output.starts_with("wmctrl no está instalado"));
    }

    #[tokio::test]
    async fn missing_action() {
        let tool = WindowManagerTool::new(Duration::from_secs(1));
        let out = tool.call(&[], &ToolContext::default()).await.unwrap();
        assert!(out.output.starts_with("Falta la acción"));
    }
}
