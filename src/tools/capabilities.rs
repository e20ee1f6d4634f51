//! Optional screen and input capabilities.
//!
//! Vision and automation are collaborators injected at startup. When one
//! is absent its tools stay registered and report that the capability is
//! unavailable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::literal::Literal;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};
use crate::exec::{ExecError, run_command};

/// Failure inside a capability backend.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The backend binary or device could not be used.
    #[error("{0}")]
    Unavailable(String),

    /// The backend ran and failed.
    #[error("{0}")]
    Failed(String),
}

impl From<ExecError> for CapabilityError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::NotFound(program) => Self::Unavailable(format!("{program} no encontrado")),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Screen description.
#[async_trait]
pub trait Vision: Send + Sync {
    /// Capture the screen and describe it in a sentence or two.
    async fn describe_screen(&self) -> Result<String, CapabilityError>;
}

/// Mouse and keyboard control. Each method returns a short confirmation.
#[async_trait]
pub trait Automation: Send + Sync {
    async fn type_text(&self, text: &str) -> Result<String, CapabilityError>;

    async fn press_key(&self, key: &str) -> Result<String, CapabilityError>;

    async fn hotkey(&self, keys: &[String]) -> Result<String, CapabilityError>;

    /// Click at `position`, or at the pointer when `None`.
    async fn click(
        &self,
        position: Option<(i64, i64)>,
        button: &str,
        clicks: u32,
    ) -> Result<String, CapabilityError>;

    async fn move_to(&self, x: i64, y: i64) -> Result<String, CapabilityError>;

    /// Scroll up for positive `clicks`, down for negative.
    async fn scroll(&self, clicks: i64) -> Result<String, CapabilityError>;

    async fn wait(&self, seconds: f64) -> Result<String, CapabilityError> {
        tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
        Ok(format!("Esperé {seconds} segundos"))
    }
}

/// `screenshot()`.
#[derive(Clone, Default)]
pub struct ScreenshotTool {
    vision: Option<Arc<dyn Vision>>,
}

impl ScreenshotTool {
    pub fn new(vision: Option<Arc<dyn Vision>>) -> Self {
        Self { vision }
    }
}

#[async_trait]
impl ToolHandler for ScreenshotTool {
    fn description(&self) -> &str {
        "Describe lo que hay en la pantalla"
    }

    async fn call(&self, _args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(vision) = &self.vision else {
            return Ok(ToolResult::failure(
                tags::CORE_ERROR,
                "Sensores de visión no disponibles.",
            ));
        };
        Ok(match vision.describe_screen().await {
            Ok(description) => ToolResult::success(tags::VISION, description),
            Err(e) => {
                tracing::warn!(error = %e, "screen description failed");
                ToolResult::failure(tags::VISION, format!("Error en screenshot: {e}"))
            }
        })
    }
}

/// Which input action a [`HandsTool`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandAction {
    Type,
    Press,
    Hotkey,
    Click,
    Wait,
    Move,
    Scroll,
}

impl HandAction {
    /// Every action, paired with its tool name.
    pub const ALL: [(&'static str, Self); 7] = [
        ("type", Self::Type),
        ("press", Self::Press),
        ("hotkey", Self::Hotkey),
        ("click", Self::Click),
        ("wait", Self::Wait),
        ("move", Self::Move),
        ("scroll", Self::Scroll),
    ];

    fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, a)| *a == self)
            .map_or("hands", |(n, _)| n)
    }

    fn missing_message(self) -> &'static str {
        match self {
            Self::Wait => "Falta argumento para wait(segundos).",
            Self::Move => "Faltan coordenadas para move(x, y).",
            Self::Scroll => "Falta argumento para scroll(clicks).",
            Self::Click => "Actuadores no disponibles.",
            _ => "Actuadores no disponibles o faltan argumentos.",
        }
    }

    fn min_args(self) -> usize {
        match self {
            Self::Click => 0,
            Self::Move => 2,
            _ => 1,
        }
    }
}

/// One mouse or keyboard tool.
#[derive(Clone)]
pub struct HandsTool {
    action: HandAction,
    hands: Option<Arc<dyn Automation>>,
}

impl HandsTool {
    pub fn new(action: HandAction, hands: Option<Arc<dyn Automation>>) -> Self {
        Self { action, hands }
    }

    async fn perform(
        &self,
        hands: &dyn Automation,
        args: &[Literal],
    ) -> Result<Result<String, CapabilityError>, &'static str> {
        let first = arg_text(args, 0).unwrap_or_default();
        Ok(match self.action {
            HandAction::Type => hands.type_text(&first).await,
            HandAction::Press => hands.press_key(&first).await,
            HandAction::Hotkey => {
                let keys: Vec<String> = args.iter().map(ToString::to_string).collect();
                hands.hotkey(&keys).await
            }
            HandAction::Click => {
                let coord = |i: usize| args.get(i).and_then(Literal::as_int).filter(|v| *v >= 0);
                let position = coord(0).zip(coord(1));
                let button = arg_text(args, 2).unwrap_or_else(|| "left".to_owned());
                let clicks = args
                    .get(3)
                    .and_then(Literal::as_int)
                    .and_then(|c| u32::try_from(c).ok())
                    .unwrap_or(1);
                hands.click(position, &button, clicks).await
            }
            HandAction::Wait => {
                let seconds = args[0]
                    .as_float()
                    .ok_or("Argumento de wait debe ser un número.")?;
                hands.wait(seconds).await
            }
            HandAction::Move => {
                let (Some(x), Some(y)) = (args[0].as_int(), args[1].as_int()) else {
                    return Err("Faltan coordenadas para move(x, y).");
                };
                hands.move_to(x, y).await
            }
            HandAction::Scroll => {
                let clicks = args[0]
                    .as_int()
                    .ok_or("Argumento de scroll debe ser un número.")?;
                hands.scroll(clicks).await
            }
        })
    }
}

#[async_trait]
impl ToolHandler for HandsTool {
    fn description(&self) -> &str {
        match self.action {
            HandAction::Type => "Escribe texto en la ventana activa",
            HandAction::Press => "Presiona una tecla",
            HandAction::Hotkey => "Ejecuta un atajo de teclado (teclas...)",
            HandAction::Click => "Hace clic (x, y, botón, clics)",
            HandAction::Wait => "Espera unos segundos",
            HandAction::Move => "Mueve el mouse a (x, y)",
            HandAction::Scroll => "Desplaza la vista (clics)",
        }
    }

    fn parameters(&self) -> &[&'static str] {
        match self.action {
            HandAction::Type => &["texto"],
            HandAction::Press => &["tecla"],
            HandAction::Hotkey => &["teclas"],
            HandAction::Click => &["x", "y", "boton", "clics"],
            HandAction::Wait => &["segundos"],
            HandAction::Move => &["x", "y"],
            HandAction::Scroll => &["clics"],
        }
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let action = self.action;
        let Some(hands) = self.hands.as_deref().filter(|_| args.len() >= action.min_args()) else {
            return Ok(ToolResult::failure(tags::HANDS, action.missing_message()));
        };
        Ok(match self.perform(hands, args).await {
            Err(usage) => ToolResult::failure(tags::HANDS, usage),
            Ok(Ok(message)) => ToolResult::success(tags::HANDS, message),
            Ok(Err(e)) => {
                tracing::warn!(action = action.name(), error = %e, "automation failed");
                ToolResult::failure(tags::HANDS, format!("Error en {}: {e}", action.name()))
            }
        })
    }
}

/// [`Automation`] backed by the `xdotool` binary (X11).
#[derive(Debug, Clone)]
pub struct XdotoolAutomation {
    binary: String,
    timeout: Duration,
}

impl XdotoolAutomation {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "xdotool".to_owned(),
            timeout,
        }
    }

    /// `None` when `xdotool` is not installed.
    pub fn detect(timeout: Duration) -> Option<Self> {
        which::which("xdotool").ok().map(|_| Self::new(timeout))
    }

    async fn xdotool(&self, args: Vec<String>) -> Result<(), CapabilityError> {
        let out = run_command(&self.binary, &args, self.timeout, None).await?;
        if out.success() {
            Ok(())
        } else {
            Err(CapabilityError::Failed(out.stderr_text().trim().to_owned()))
        }
    }
}

/// Translate common key names to X keysyms.
pub fn keysym(key: &str) -> String {
    match key.to_lowercase().as_str() {
        "enter" | "return" => "Return".to_owned(),
        "esc" | "escape" => "Escape".to_owned(),
        "tab" => "Tab".to_owned(),
        "space" => "space".to_owned(),
        "backspace" => "BackSpace".to_owned(),
        "ctrl" | "control" => "ctrl".to_owned(),
        "win" | "super" | "cmd" => "super".to_owned(),
        "up" | "down" | "left" | "right" | "home" | "end" => {
            let mut chars = key.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
                .unwrap_or_default()
        }
        lower => lower.to_owned(),
    }
}

fn button_number(button: &str) -> &'static str {
    match button {
        "right" => "3",
        "middle" => "2",
        _ => "1",
    }
}

#[async_trait]
impl Automation for XdotoolAutomation {
    async fn type_text(&self, text: &str) -> Result<String, CapabilityError> {
        tracing::info!(chars = text.chars().count(), "typing");
        self.xdotool(vec!["type".into(), "--delay".into(), "10".into(), "--".into(), text.into()])
            .await?;
        Ok(format!("Escribí: {text}"))
    }

    async fn press_key(&self, key: &str) -> Result<String, CapabilityError> {
        self.xdotool(vec!["key".into(), keysym(key)]).await?;
        Ok(format!("Presioné la tecla: {key}"))
    }

    async fn hotkey(&self, keys: &[String]) -> Result<String, CapabilityError> {
        let combo: Vec<String> = keys.iter().map(|k| keysym(k)).collect();
        self.xdotool(vec!["key".into(), combo.join("+")]).await?;
        Ok(format!("Ejecuté el atajo: {}", keys.join(" + ")))
    }

    async fn click(
        &self,
        position: Option<(i64, i64)>,
        button: &str,
        clicks: u32,
    ) -> Result<String, CapabilityError> {
        if let Some((x, y)) = position {
            self.xdotool(vec!["mousemove".into(), x.to_string(), y.to_string()])
                .await?;
        }
        self.xdotool(vec![
            "click".into(),
            "--repeat".into(),
            clicks.to_string(),
            button_number(button).into(),
        ])
        .await?;
        Ok(match position {
            Some((x, y)) => format!("Hice {clicks} clic(s) {button} en ({x}, {y})"),
            None => format!("Hice {clicks} clic(s) {button} en la posición actual"),
        })
    }

    async fn move_to(&self, x: i64, y: i64) -> Result<String, CapabilityError> {
        self.xdotool(vec!["mousemove".into(), x.to_string(), y.to_string()])
            .await?;
        Ok(format!("Moví el mouse a ({x}, {y})"))
    }

    async fn scroll(&self, clicks: i64) -> Result<String, CapabilityError> {
        let button = if clicks >= 0 { "4" } else { "5" };
        self.xdotool(vec![
            "click".into(),
            "--repeat".into(),
            clicks.unsigned_abs().to_string(),
            button.into(),
        ])
        .await?;
        Ok(format!("Desplacé {clicks} clics"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Automation for Recorder {
        async fn type_text(&self, text: &str) -> Result<String, CapabilityError> {
            self.calls.lock().unwrap().push(format!("type {text}"));
            Ok(format!("Escribí: {text}"))
        }
        async fn press_key(&self, key: &str) -> Result<String, CapabilityError> {
            Err(CapabilityError::Failed(format!("tecla {key} rota")))
        }
        async fn hotkey(&self, keys: &[String]) -> Result<String, CapabilityError> {
            Ok(keys.join("+"))
        }
        async fn click(
            &self,
            position: Option<(i64, i64)>,
            button: &str,
            clicks: u32,
        ) -> Result<String, CapabilityError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("click {position:?} {button} {clicks}"));
            Ok("ok".into())
        }
        async fn move_to(&self, x: i64, y: i64) -> Result<String, CapabilityError> {
            Ok(format!("{x},{y}"))
        }
        async fn scroll(&self, clicks: i64) -> Result<String, CapabilityError> {
            Ok(clicks.to_string())
        }
    }

    fn tool(action: HandAction, hands: &Arc<Recorder>) -> HandsTool {
        let hands: Arc<dyn Automation> = hands.clone();
        HandsTool::new(action, Some(hands))
    }

    #[tokio::test]
    async fn absent_capabilities_report_unavailable() {
        let ctx = ToolContext::default();
        let shot = ScreenshotTool::new(None).call(&[], &ctx).await.unwrap();
        assert_eq!(shot.output, "Sensores de visión no disponibles.");
        assert_eq!(shot.tag, tags::CORE_ERROR);

        let wait = HandsTool::new(HandAction::Wait, None)
            .call(&[Literal::Int(1)], &ctx)
            .await
            .unwrap();
        assert_eq!(wait.output, "Falta argumento para wait(segundos).");
        let typed = HandsTool::new(HandAction::Type, None)
            .call(&[Literal::Str("hola".into())], &ctx)
            .await
            .unwrap();
        assert_eq!(typed.output, "Actuadores no disponibles o faltan argumentos.");
    }

    #[tokio::test]
    async fn click_parses_optional_args() {
        let rec = Arc::new(Recorder::default());
        let ctx = ToolContext::default();
        tool(HandAction::Click, &rec).call(&[], &ctx).await.unwrap();
        tool(HandAction::Click, &rec)
            .call(
                &[Literal::Int(10), Literal::Str("20".into()), Literal::Str("right".into())],
                &ctx,
            )
            .await
            .unwrap();
        let calls = rec.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["click None left 1", "click Some((10, 20)) right 1"]);
    }

    #[tokio::test]
    async fn bad_numbers_are_usage_errors() {
        let rec = Arc::new(Recorder::default());
        let ctx = ToolContext::default();
        let wait = tool(HandAction::Wait, &rec)
            .call(&[Literal::Str("pronto".into())], &ctx)
            .await
            .unwrap();
        assert_eq!(wait.output, "Argumento de wait debe ser un número.");
        let moved = tool(HandAction::Move, &rec)
            .call(&[Literal::Int(1)], &ctx)
            .await
            .unwrap();
        assert_eq!(moved.output, "Faltan coordenadas para move(x, y).");
    }

    #[tokio::test]
    async fn backend_failure_is_reported() {
        let rec = Arc::new(Recorder::default());
        let out = tool(HandAction::Press, &rec)
            .call(&[Literal::Str("f5".into())], &ToolContext::default())
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.output, "Error en press: tecla f5 rota");
    }

    #[tokio::test]
    async fn default_wait_sleeps() {
        let rec = Recorder::default();
        let msg = rec.wait(0.01).await.unwrap();
        assert_eq!(msg, "Esperé 0.01 segundos");
    }

    #[test]
    fn keysyms() {
        assert_eq!(keysym("enter"), "Return");
        assert_eq!(keysym("LEFT"), "Left");
        assert_eq!(keysym("f5"), "f5");
    }
}
