//! `read_file` and `write_file`, confined to the project root.

use std::path::PathBuf;

use async_trait::async_trait;

use super::literal::Literal;
use super::path_validation::resolve_in_root;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags, truncate_chars};

/// Characters of file content returned to the model.
pub const MAX_READ_CHARS: usize = 2000;

const TRUNCATION_MARKER: &str = "\n... (contenido truncado por longitud)";

fn denied(path: &str) -> ToolResult {
    ToolResult::failure(tags::FILES, format!("Acceso denegado o ruta inválida: {path}"))
}

/// `read_file(path)`.
#[derive(Debug, Clone)]
pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    /// Read files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    fn description(&self) -> &str {
        "Lee un archivo de texto del proyecto"
    }

    fn parameters(&self) -> &[&'static str] {
        &["path"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(path) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(
                tags::FILES,
                "Falta el nombre del archivo para leer.",
            ));
        };
        let Ok(target) = resolve_in_root(&path, &self.root) else {
            tracing::warn!(path = %path, "read outside project root refused");
            return Ok(denied(&path));
        };
        if !target.is_file() {
            return Ok(ToolResult::failure(
                tags::FILES,
                format!("El archivo no existe: {path}"),
            ));
        }
        match tokio::fs::read_to_string(&target).await {
            Ok(content) => Ok(ToolResult::success(
                tags::FILES,
                truncate_chars(&content, MAX_READ_CHARS, TRUNCATION_MARKER),
            )),
            Err(e) => Ok(ToolResult::failure(
                tags::FILES,
                format!("Error leyendo archivo: {e}"),
            )),
        }
    }
}

/// `write_file(path, content)`. Disabled in safe mode.
#[derive(Debug, Clone)]
pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    /// Write files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ToolHandler for WriteFileTool {
    fn description(&self) -> &str {
        "Escribe contenido en un archivo del proyecto"
    }

    fn parameters(&self) -> &[&'static str] {
        &["path", "content"]
    }

    async fn call(&self, args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        if ctx.safe_mode {
            return Ok(ToolResult::failure(
                tags::SECURITY,
                "Escritura de archivos bloqueada en Modo Seguro por precaución.",
            ));
        }
        let (Some(path), Some(content)) = (arg_text(args, 0), args.get(1)) else {
            return Ok(ToolResult::failure(
                tags::FILES,
                "Faltan argumentos: write_file(ruta, contenido).",
            ));
        };
        let Ok(target) = resolve_in_root(&path, &self.root) else {
            tracing::warn!(path = %path, "write outside project root refused");
            return Ok(denied(&path));
        };

        let write = async {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content.to_string()).await
        };
        match write.await {
            Ok(()) => {
                tracing::info!(path = %target.display(), "file written");
                Ok(ToolResult::success(
                    tags::FILES,
                    format!("Archivo escrito exitosamente: {path}"),
                ))
            }
            Err(e) => Ok(ToolResult::failure(
                tags::FILES,
                format!("Error escribiendo archivo: {e}"),
            )),
        }
    }
}
