//! Interface de terminal do boxflow: spinner e saída colorida para o `demo`.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`RunProgress`] é um [`EventSink`] que desenha
//! cada evento do workflow no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use crate::error::TransportClosed;
use crate::events::{Event, EventSink};
use crate::state_machine::{RETRY_BUDGET, RunOutcome, RunReport, Stage};

// Último sorteio visto e contagem de falhas, para distinguir
// RETRY_UPDATE de sucesso e de falha.
#[derive(Debug, Default)]
struct Seen {
    last_draw: Option<(usize, u32)>,
    retries: u32,
}

/// Indicador visual de progresso para a execução de um workflow no terminal.
///
/// Exibe um spinner animado enquanto cada tentativa aguarda o veredito e
/// mensagens coloridas para sucesso (verde), falha (vermelho) e retentativa (amarelo).
pub struct RunProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para mensagens de retentativa.
    yellow: Style,
    seen: Mutex<Seen>,
}

impl RunProgress {
    /// Inicia o spinner e retorna a instância de progresso.
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message("READY");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            seen: Mutex::new(Seen::default()),
        }
    }

    fn box_drawn(&self, stage_index: usize, value: u32) {
        self.seen.lock().last_draw = Some((stage_index, value));
        let expected = Stage::from_index(stage_index)
            .map(|stage| format!("{}-{}", stage.range().start(), stage.range().end()))
            .unwrap_or_default();
        self.pb
            .set_message(format!("Box {}: drew {value}, needs {expected}", stage_index + 1));
    }

    // Falha quando a contagem sobe; caso contrário o último sorteio foi aceito.
    fn retry_update(&self, count: u32) {
        let mut seen = self.seen.lock();
        let (index, value) = seen.last_draw.unwrap_or_default();
        if count > seen.retries {
            self.pb.println(format!(
                "  {} Box {} failed with {value}, retry {count}/{RETRY_BUDGET}",
                self.yellow.apply_to("↻"),
                index + 1
            ));
        } else {
            self.pb.println(format!(
                "  {} Box {}: {value}",
                self.green.apply_to("✓"),
                index + 1
            ));
        }
        seen.retries = count;
    }

    /// Finaliza o spinner e exibe o resultado final do workflow.
    ///
    /// Sucesso é mostrado em verde com checkmark; falha em vermelho com X.
    pub fn complete(&self, outcome: RunOutcome) {
        self.pb.finish_and_clear();
        match outcome {
            RunOutcome::Success => {
                println!("  {} Workflow completed successfully", self.green.apply_to("✓"));
            }
            RunOutcome::Failed => {
                println!(
                    "  {} Workflow failed after {RETRY_BUDGET} retries",
                    self.red.apply_to("✗")
                );
            }
        }
    }

    /// Imprime o relatório da execução formatado em JSON com estilo colorido.
    pub fn print_report(&self, report: &RunReport) {
        let status_style = match report.outcome {
            RunOutcome::Success => &self.green,
            RunOutcome::Failed => &self.red,
        };
        println!();
        println!("{}", status_style.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

impl EventSink for RunProgress {
    fn emit(&self, event: Event) -> Result<(), TransportClosed> {
        match event {
            Event::Status(status) => self.pb.set_message(format!("{status:?}").to_uppercase()),
            Event::BoxUpdate { stage_index, value } => self.box_drawn(stage_index, value),
            Event::RetryUpdate { count } => self.retry_update(count),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Status;

    #[test]
    fn progress_accepts_every_event() {
        let progress = RunProgress::start();
        let events = [
            Event::Status(Status::Running),
            Event::BoxUpdate { stage_index: 0, value: 90 },
            Event::RetryUpdate { count: 1 },
            Event::BoxUpdate { stage_index: 0, value: 12 },
            Event::RetryUpdate { count: 1 },
            Event::Status(Status::Failed),
        ];
        for event in events {
            assert!(progress.emit(event).is_ok());
        }
        assert_eq!(progress.seen.lock().retries, 1);
        assert_eq!(progress.seen.lock().last_draw, Some((0, 12)));
        progress.complete(RunOutcome::Failed);
    }
}
