//! Storefront simulations: shipping quotes, payments and budget PDFs.

use std::path::PathBuf;

use async_trait::async_trait;

use super::literal::Literal;
use super::pdf;
use super::types::{ToolContext, ToolError, ToolHandler, ToolResult, arg_text, tags};
use crate::memory::sanitize_user_id;

/// `check_shipping(destination)`: deterministic mock quote.
#[derive(Debug, Default)]
pub struct CheckShippingTool;

/// Cost and business days for a destination.
pub fn shipping_quote(destination: &str) -> (u64, u64) {
    let len = destination.chars().count() as u64;
    (2500 + len * 100, 2 + len % 3)
}

#[async_trait]
impl ToolHandler for CheckShippingTool {
    fn description(&self) -> &str {
        "Calcula costo y tiempo de envío a un destino"
    }

    fn parameters(&self) -> &[&'static str] {
        &["destino"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(destination) = arg_text(args, 0) else {
            return Ok(ToolResult::failure(
                tags::SHIPPING,
                "Falta el destino para calcular el envío.",
            ));
        };
        let (cost, days) = shipping_quote(&destination);
        Ok(ToolResult::success(
            tags::SHIPPING,
            format!(
                "Costo de envío a {destination}: ${cost}. Tiempo estimado: {days} días hábiles."
            ),
        ))
    }
}

/// `process_payment(amount, method)`: always succeeds, nothing is charged.
#[derive(Debug, Default)]
pub struct ProcessPaymentTool;

#[async_trait]
impl ToolHandler for ProcessPaymentTool {
    fn description(&self) -> &str {
        "Procesa un pago simulado (monto, método)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["monto", "metodo"]
    }

    async fn call(&self, args: &[Literal], _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let (Some(amount), Some(method)) = (arg_text(args, 0), arg_text(args, 1)) else {
            return Ok(ToolResult::failure(
                tags::PAYMENT,
                "Faltan monto y método (ej: 5000, tarjeta).",
            ));
        };
        tracing::info!(%amount, %method, "simulated payment");
        Ok(ToolResult::success(
            tags::PAYMENT,
            format!("Pago de ${amount} con {method} procesado con éxito. (Simulación)"),
        ))
    }
}

/// `generate_budget_pdf(item, price, quantity)`: writes a budget under
/// the configured output directory.
#[derive(Debug, Clone)]
pub struct BudgetPdfTool {
    output_dir: PathBuf,
}

impl BudgetPdfTool {
    /// Write budgets into `output_dir`, created on demand.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for BudgetPdfTool {
    fn description(&self) -> &str {
        "Genera un presupuesto en PDF (item, precio, cantidad)"
    }

    fn parameters(&self) -> &[&'static str] {
        &["item", "precio", "cantidad"]
    }

    async fn call(&self, args: &[Literal], ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let (Some(item), Some(price), Some(quantity)) =
            (arg_text(args, 0), arg_text(args, 1), arg_text(args, 2))
        else {
            return Ok(ToolResult::failure(
                tags::PDF,
                "Faltan datos: item, precio, cantidad.",
            ));
        };

        let user = sanitize_user_id(ctx.user_or_anonymous());
        let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let name = format!("budget_{user}_{suffix}.pdf");
        let bytes = pdf::render_budget(ctx.user_or_anonymous(), &item, &price, &quantity);

        let path = self.output_dir.join(&name);
        let written = async {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            tokio::fs::write(&path, &bytes).await
        }
        .await;
        if let Err(e) = written {
            tracing::error!(path = %path.display(), error = %e, "budget pdf failed");
            return Ok(ToolResult::failure(
                tags::CORE_ERROR,
                format!("Error al generar el PDF: {e}"),
            ));
        }

        tracing::info!(path = %path.display(), "budget pdf written");
        Ok(ToolResult::success(
            tags::PDF,
            format!(
                "Presupuesto generado para {item}. Podés descargarlo desde la interfaz. Link: /data/budgets/{name}"
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn s(v: &str) -> Literal {
        Literal::Str(v.to_owned())
    }

    #[tokio::test]
    async fn shipping_to_rosario() {
        let out = CheckShippingTool
            .call(&[s("Rosario")], &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(
            out.output,
            "Costo de envío a Rosario: $3200. Tiempo estimado: 3 días hábiles."
        );
        assert_eq!(out.tag, tags::SHIPPING);
    }

    #[tokio::test]
    async fn payment_needs_both_args() {
        let ctx = ToolContext::default();
        let missing = ProcessPaymentTool.call(&[Literal::Int(5000)], &ctx).await.unwrap();
        assert!(!missing.success);
        let ok = ProcessPaymentTool
            .call(&[Literal::Int(5000), s("tarjeta")], &ctx)
            .await
            .unwrap();
        assert_eq!(
            ok.output,
            "Pago de $5000 con tarjeta procesado con éxito. (Simulación)"
        );
    }

    #[tokio::test]
    async fn budget_pdf_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let tool = BudgetPdfTool::new(dir.path().join("budgets"));
        let ctx = ToolContext::new("ana", None);
        let out = tool
            .call(&[s("Silla"), Literal::Int(1500), Literal::Int(4)], &ctx)
            .await
            .unwrap();
        assert!(out.success, "{}", out.output);
        let name = out.output.rsplit('/').next().unwrap();
        assert!(name.starts_with("budget_ana_") && name.ends_with(".pdf"));
        let bytes = std::fs::read(dir.path().join("budgets").join(name)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn budget_pdf_missing_args() {
        let dir = tempfile::tempdir().unwrap();
        let out = BudgetPdfTool::new(dir.path())
            .call(&[s("Silla")], &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out.output, "Faltan datos: item, precio, cantidad.");
    }
}
