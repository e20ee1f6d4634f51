//! `remember`, `forget` and `memory_stats`: long-term fact tools.

use async_trait::async_trait;

use super::literal::Literal;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};

/// Keys that may not be stored while safe mode is on.
/// Matched case-insensitively.
pub const SENSITIVE_KEYS: &[&str] = &["password", "token", "secreto", "api_key"];

fn is_sensitive(key: &str) -> bool {
    let key = key.trim().to_ascii_lowercase();
    SENSITIVE_KEYS.contains(&key.as_str())
}

const NO_STORE: &str = "Almacén de hechos no disponible.";

/// `remember(key, value)`: store a fact for the session user.
#[derive(Debug, Default)]
pub struct RememberTool;

#[async_trait]
impl ToolHandler for RememberTool {
    fn description(&self) -> &str {
        "Guarda un hecho importante sobre el usuario (clave, valor)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["key", "value"]
    }

    async fn call(&self, args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let (Some(facts), Some(user)) = (&ctx.facts, &ctx.session_user) else {
            return Ok(ToolResult::failure(tags::CORE_ERROR, NO_STORE));
        };
        let (Some(key), Some(value)) = (arg_text(args, 0), arg_text(args, 1)) else {
            return Ok(ToolResult::failure(
                tags::CORE_ERROR,
                "Faltan argumentos para remember(clave, valor).",
            ));
        };

        if ctx.safe_mode && is_sensitive(&key) {
            tracing::warn!(user = %user, key = %key, "sensitive fact refused in safe mode");
            return Ok(ToolResult::failure(
                tags::SECURITY,
                format!("Seguridad: No puedo guardar '{key}' en Modo Seguro."),
            ));
        }

        match facts.set(user, &key, &value) {
            Ok(()) => Ok(ToolResult::success(
                tags::MEMORY,
                format!("Recordado: {key} = {value}"),
            )),
            Err(e) => {
                tracing::error!(user = %user, error = %e, "failed to store fact");
                Ok(ToolResult::failure(
                    tags::CORE_ERROR,
                    format!("No pude guardar '{key}'."),
                ))
            }
        }
    }
}

/// `forget(key)`: remove a fact. Disabled in safe mode.
#[derive(Debug, Default)]
pub struct ForgetTool;

#[async_trait]
impl ToolHandler for ForgetTool {
    fn description(&self) -> &str {
        "Olvida un hecho guardado (clave)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["key"]
    }

    async fn call(&self, args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        if ctx.safe_mode {
            return Ok(ToolResult::failure(
                tags::SECURITY,
                "Olvidar está bloqueado en Modo Seguro por precaución.",
            ));
        }
        let (Some(facts), Some(user)) = (&ctx.facts, &ctx.session_user) else {
            return Ok(ToolResult::failure(tags::CORE_ERROR, NO_STORE));
        };
        let Some(key) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(
                tags::CORE_ERROR,
                "Falta argumento para forget(clave).",
            ));
        };

        match facts.remove(user, &key) {
            Ok(()) => Ok(ToolResult::success(tags::MEMORY, format!("Olvidado: {key}"))),
            Err(e) => {
                tracing::error!(user = %user, error = %e, "failed to remove fact");
                Ok(ToolResult::failure(
                    tags::CORE_ERROR,
                    format!("No pude olvidar '{key}'."),
                ))
            }
        }
    }
}

/// `memory_stats()`: how many facts are stored for the session user.
#[derive(Debug, Default)]
pub struct MemoryStatsTool;

#[async_trait]
impl ToolHandler for MemoryStatsTool {
    fn description(&self) -> &str {
        "Informa cuántos hechos tengo guardados sobre el usuario"
    }

    async fn call(&self, _args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let (Some(facts), Some(user)) = (&ctx.facts, &ctx.session_user) else {
            return Ok(ToolResult::failure(tags::CORE_ERROR, NO_STORE));
        };
        let count = facts.get(user).len();
        let output = if count == 0 {
            "Mi memoria está vacía. Podés pedirme que recuerde algo con [[remember(clave, valor)]]."
                .to_owned()
        } else {
            format!("Memoria: {count} hechos guardados.")
        };
        Ok(ToolResult::success(tags::MEMORY, output))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use std::sync::Arc;

    use super::*;
    use crate::memory::{FactStore, FileFactStore};

    fn ctx(dir: &std::path::Path, safe: bool) -> (ToolContext, Arc<FileFactStore>) {
        let store = Arc::new(FileFactStore::new(dir).unwrap());
        let facts: Arc<dyn FactStore> = store.clone();
        (ToolContext::new("u1", Some(facts)).with_safe_mode(safe), store)
    }

    fn s(v: &str) -> Literal {
        Literal::Str(v.into())
    }

    #[tokio::test]
    async fn remember_stores_fact() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), false);
        let out = RememberTool.call(&[s("color"), s("azul")], &ctx).await.unwrap();
        assert!(out.success);
        assert_eq!(out.output, "Recordado: color = azul");
        assert_eq!(out.tag, tags::MEMORY);
        assert_eq!(store.get("u1").get("color").map(String::as_str), Some("azul"));
    }

    #[tokio::test]
    async fn remember_stringifies_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), false);
        RememberTool
            .call(&[s("edad"), Literal::Int(30)], &ctx)
            .await
            .unwrap();
        assert_eq!(store.get("u1").get("edad").map(String::as_str), Some("30"));
    }

    #[tokio::test]
    async fn safe_mode_blocks_sensitive_keys_only() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), true);
        for key in SENSITIVE_KEYS {
            let out = RememberTool.call(&[s(key), s("x")], &ctx).await.unwrap();
            assert!(!out.success);
            assert_eq!(out.tag, tags::SECURITY);
        }
        assert!(store.get("u1").is_empty());
        let ok = RememberTool.call(&[s("color"), s("azul")], &ctx).await.unwrap();
        assert!(ok.success);
    }

    #[tokio::test]
    async fn sensitive_keys_match_any_case() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), true);
        for key in ["Password", "API_KEY", " TOKEN "] {
            let out = RememberTool.call(&[s(key), s("x")], &ctx).await.unwrap();
            assert!(!out.success, "{key} was stored");
        }
        assert!(store.get("u1").is_empty());
    }

    #[tokio::test]
    async fn memory_stats_counts_user_facts() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), false);
        let empty = MemoryStatsTool.call(&[], &ctx).await.unwrap();
        assert!(empty.success);
        assert!(empty.output.starts_with("Mi memoria está vacía."));

        store.set("u1", "color", "azul").unwrap();
        store.set("u1", "nombre", "Ana").unwrap();
        store.set("otro", "color", "rojo").unwrap();
        let out = MemoryStatsTool.call(&[], &ctx).await.unwrap();
        assert_eq!(out.output, "Memoria: 2 hechos guardados.");
        assert_eq!(out.tag, tags::MEMORY);

        let none = MemoryStatsTool.call(&[], &ToolContext::default()).await.unwrap();
        assert!(!none.success);
    }

    #[tokio::test]
    async fn forget_disabled_in_safe_mode() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), true);
        store.set("u1", "color", "azul").unwrap();
        let out = ForgetTool.call(&[s("color")], &ctx).await.unwrap();
        assert!(!out.success);
        assert_eq!(store.get("u1").len(), 1);
    }

    #[tokio::test]
    async fn forget_removes_fact() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, store) = ctx(dir.path(), false);
        store.set("u1", "color", "azul").unwrap();
        let out = ForgetTool.call(&[s("color")], &ctx).await.unwrap();
        assert!(out.success);
        assert_eq!(out.output, "Olvidado: color");
        assert!(store.get("u1").is_empty());
    }

    #[tokio::test]
    async fn missing_store_or_args_fail_softly() {
        let out = RememberTool
            .call(&[s("a"), s("b")], &ToolContext::default())
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.tag, tags::CORE_ERROR);

        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path(), false);
        let out = RememberTool.call(&[s("solo")], &ctx).await.unwrap();
        assert!(!out.success);
        let out = ForgetTool.call(&[], &ctx).await.unwrap();
        assert!(!out.success);
    }
}
