//! The scenario orchestrator
//!
//! A fixed pipeline of named steps executed strictly in order, each
//! interacting with the UI and/or the REST API, carrying discovered
//! identifiers forward and halting on the first failure. No rollback:
//! data created in the backend stays there.

use std::time::Instant;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info};

use crate::api::{resolve_by, ApiClient};
use crate::browser::{BrowserConfig, PageCommand, PageDriver};
use crate::config::{ConfigOutcome, ScenarioConfig};
use crate::error::{E2eError, E2eResult};
use crate::model::{GroupStatus, InstallmentStatus, QuotaStatus};
use crate::poll::{poll_until, Observation, PollOutcome, PollPolicy};
use crate::testdata::{
    RunIdentity, BANK_ACCOUNT, BANK_AGENCY, BANK_NAME, PARTICIPANT_ADDRESS,
};

/// The fixed step pipeline, in required order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepName {
    Authenticate,
    RegisterParticipant,
    CreateGroup,
    CreateQuota,
    ResolveQuota,
    PayFirstInstallment,
    ScheduleOpeningAssembly,
}

impl StepName {
    pub const ALL: [StepName; 7] = [
        StepName::Authenticate,
        StepName::RegisterParticipant,
        StepName::CreateGroup,
        StepName::CreateQuota,
        StepName::ResolveQuota,
        StepName::PayFirstInstallment,
        StepName::ScheduleOpeningAssembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Authenticate => "authenticate",
            StepName::RegisterParticipant => "register participant",
            StepName::CreateGroup => "create group",
            StepName::CreateQuota => "create quota",
            StepName::ResolveQuota => "resolve quota identifiers",
            StepName::PayFirstInstallment => "pay first installment and await activation",
            StepName::ScheduleOpeningAssembly => "schedule opening assembly",
        }
    }
}

/// Identifiers of the quota created through the UI
#[derive(Debug, Clone, Copy)]
pub struct QuotaRef {
    pub id: i64,
    pub number: i64,
}

/// Mutable context threaded through the steps
pub struct ScenarioContext {
    pub identity: RunIdentity,
    pub token: Option<String>,
    pub group_id: Option<i64>,
    pub quota: Option<QuotaRef>,
}

impl ScenarioContext {
    fn new() -> Self {
        Self {
            identity: RunIdentity::generate(),
            token: None,
            group_id: None,
            quota: None,
        }
    }
}

/// Raise a precondition failure naming the missing dependency
pub fn require<T: Copy>(value: &Option<T>, what: &str) -> E2eResult<T> {
    value.ok_or_else(|| E2eError::MissingDependency {
        what: what.to_string(),
    })
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: &'static str,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Outcome of the whole run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { step: &'static str, error: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed | Outcome::Skipped { .. })
    }
}

/// Run the scenario, honoring the skip outcome when credentials are absent
pub async fn run_scenario(outcome: ConfigOutcome) -> E2eResult<ScenarioReport> {
    match outcome {
        ConfigOutcome::Skip { reason } => {
            info!("scenario skipped: {}", reason);
            Ok(ScenarioReport {
                outcome: Outcome::Skipped { reason },
                steps: Vec::new(),
                duration_ms: 0,
            })
        }
        ConfigOutcome::Ready(config) => Scenario::launch(config).await?.run().await,
    }
}

/// The scenario orchestrator
pub struct Scenario {
    config: ScenarioConfig,
    driver: PageDriver,
    context: ScenarioContext,
    api: Option<ApiClient>,
}

impl Scenario {
    /// Launch the browser session and install the environment-shaping
    /// route that pins pagination defaults on the participant listing
    pub async fn launch(config: ScenarioConfig) -> E2eResult<Self> {
        let browser = BrowserConfig {
            base_url: config.ui_base_url.clone(),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            headless: config.headless,
            default_timeout_ms: config.ui_timeout.as_millis() as u64,
        };
        let mut driver = PageDriver::launch(&browser).await?;

        driver
            .send(&PageCommand::NormalizeListQuery {
                pattern: "**/participantes**".to_string(),
                limit: 1000,
                page: 1,
            })
            .await?;

        Ok(Self {
            config,
            driver,
            context: ScenarioContext::new(),
            api: None,
        })
    }

    /// Execute every step in order, failing fast
    pub async fn run(mut self) -> E2eResult<ScenarioReport> {
        let start = Instant::now();
        let mut steps = Vec::new();
        let mut failure: Option<(StepName, String)> = None;

        info!(suffix = %self.context.identity.suffix, "starting scenario run");

        for step in StepName::ALL {
            let step_start = Instant::now();
            let result = self.run_step(step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    info!("✓ {} ({} ms)", step.as_str(), duration_ms);
                    steps.push(StepReport {
                        name: step.as_str(),
                        success: true,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("✗ {} - {}", step.as_str(), e);
                    steps.push(StepReport {
                        name: step.as_str(),
                        success: false,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                    failure = Some((step, e.to_string()));
                    break;
                }
            }
        }

        self.driver.close().await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let outcome = match failure {
            None => Outcome::Passed,
            Some((step, error)) => Outcome::Failed {
                step: step.as_str(),
                error,
            },
        };

        Ok(ScenarioReport {
            outcome,
            steps,
            duration_ms,
        })
    }

    async fn run_step(&mut self, step: StepName) -> E2eResult<()> {
        match step {
            StepName::Authenticate => self.authenticate().await,
            StepName::RegisterParticipant => self.register_participant().await,
            StepName::CreateGroup => self.create_group().await,
            StepName::CreateQuota => self.create_quota().await,
            StepName::ResolveQuota => self.resolve_quota().await,
            StepName::PayFirstInstallment => self.pay_first_installment().await,
            StepName::ScheduleOpeningAssembly => self.schedule_opening_assembly().await,
        }
    }

    fn api(&self) -> E2eResult<&ApiClient> {
        self.api.as_ref().ok_or_else(|| E2eError::MissingDependency {
            what: "API client (session token not captured)".to_string(),
        })
    }

    async fn page(&mut self, command: PageCommand) -> E2eResult<serde_json::Value> {
        self.driver.send(&command).await
    }

    async fn authenticate(&mut self) -> E2eResult<()> {
        let email = self.config.admin_email.clone();
        let password = self.config.admin_password.clone();

        self.page(PageCommand::Goto {
            url: "/login".to_string(),
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "E-mail".to_string(),
            value: email,
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Senha".to_string(),
            value: password,
            regex: false,
        })
        .await?;
        self.page(PageCommand::ClickButton {
            name: "Entrar".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/dashboard".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "dashboard".to_string(),
            regex: true,
            exact: false,
        })
        .await?;
        Ok(())
    }

    async fn register_participant(&mut self) -> E2eResult<()> {
        let identity = self.context.identity.clone();

        self.page(PageCommand::ClickLink {
            name: "Participantes".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/participantes".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "Participantes".to_string(),
            regex: false,
            exact: true,
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Novo Participante".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/participantes/novo".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "Novo Participante".to_string(),
            regex: false,
            exact: false,
        })
        .await?;

        self.page(PageCommand::FillLabel {
            label: "Nome Completo *".to_string(),
            value: identity.participant_name.clone(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Email *".to_string(),
            value: identity.participant_email.clone(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: r"CPF|CNPJ \*".to_string(),
            value: identity.participant_document.clone(),
            regex: true,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Telefone".to_string(),
            value: identity.participant_phone.clone(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Endereço".to_string(),
            value: PARTICIPANT_ADDRESS.to_string(),
            regex: true,
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Criar Participante".to_string(),
        })
        .await?;
        self.page(PageCommand::ExpectText {
            text: "Participante criado com sucesso!".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/participantes".to_string(),
            timeout_ms: None,
        })
        .await?;
        Ok(())
    }

    async fn create_group(&mut self) -> E2eResult<()> {
        let identity = self.context.identity.clone();

        self.page(PageCommand::ClickLink {
            name: "Grupos".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/grupos".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectButton {
            name: "Novo Grupo".to_string(),
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Novo Grupo".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/grupos/novo".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "Criar Novo Grupo".to_string(),
            regex: false,
            exact: false,
        })
        .await?;

        self.page(PageCommand::FillLabel {
            label: "Nome do Grupo *".to_string(),
            value: identity.group_name.clone(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Descrição do Grupo *".to_string(),
            value: identity.group_description.clone(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Banco *".to_string(),
            value: BANK_NAME.to_string(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Agência *".to_string(),
            value: BANK_AGENCY.to_string(),
            regex: false,
        })
        .await?;
        self.page(PageCommand::FillTextbox {
            name: "Conta *".to_string(),
            value: BANK_ACCOUNT.to_string(),
        })
        .await?;
        self.page(PageCommand::FillLabel {
            label: "Nome do Titular *".to_string(),
            value: identity.account_holder_name.clone(),
            regex: false,
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Criar Grupo".to_string(),
        })
        .await?;
        self.page(PageCommand::ExpectText {
            text: "Grupo criado com sucesso!".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/grupos".to_string(),
            timeout_ms: None,
        })
        .await?;

        // The UI stores the backend session token client-side; every
        // subsequent API call depends on it.
        let token_value = self
            .page(PageCommand::Evaluate {
                script: "localStorage.getItem('access_token')".to_string(),
            })
            .await?;
        let token = match token_value.as_str() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                return Err(E2eError::MissingDependency {
                    what: "session token (access_token) after login".to_string(),
                });
            }
        };
        self.api = Some(ApiClient::new(&self.config.api_base_url, &token)?);
        self.context.token = Some(token);

        // The UI never shows the backend id; recover it by listing
        // operating groups and matching on the generated unique name.
        let groups = self
            .api()?
            .groups_by_status(&GroupStatus::Operating, 50)
            .await?;
        let group = resolve_by(&groups.data, "grupo recém-criado", |g| {
            g.name == identity.group_name
        })?;
        let group_id = group.id;
        self.context.group_id = Some(group_id);

        // Operational action not exposed in the flow under test
        self.api()?
            .set_group_status(group_id, GroupStatus::ActiveAvailable)
            .await?;
        Ok(())
    }

    async fn create_quota(&mut self) -> E2eResult<()> {
        require(&self.context.group_id, "group id for quota creation")?;
        let identity = self.context.identity.clone();

        self.page(PageCommand::ClickLink {
            name: "Cotas".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/cotas".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "Gestão de Cotas".to_string(),
            regex: false,
            exact: false,
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Nova Cota".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/cotas/nova".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "Nova Cota".to_string(),
            regex: true,
            exact: false,
        })
        .await?;

        self.page(PageCommand::OpenCombobox {
            name: "Grupo de Consórcio *".to_string(),
        })
        .await?;
        self.page(PageCommand::ClickOption {
            name: identity.group_name.clone(),
            timeout_ms: None,
        })
        .await?;

        // Participant search widget: open, search by name, pick the row
        self.page(PageCommand::ClickButton {
            name: "Selecionar".to_string(),
        })
        .await?;
        self.page(PageCommand::FillPlaceholder {
            placeholder: "Buscar por nome, CPF/CNPJ ou email...".to_string(),
            value: identity.participant_name.clone(),
        })
        .await?;
        self.page(PageCommand::ExpectRow {
            text: identity.participant_name.clone(),
            timeout_ms: Some(10_000),
        })
        .await?;
        self.page(PageCommand::ClickRowButton {
            row_text: identity.participant_name.clone(),
            button: "Selecionar".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectButton {
            name: "Remover participante".to_string(),
        })
        .await?;

        // Credit value in cents: R$ 80.000,00
        self.page(PageCommand::FillSelector {
            selector: "#valorCartaCredito".to_string(),
            value: "8000000".to_string(),
        })
        .await?;
        self.page(PageCommand::FillSelector {
            selector: "#percentualTaxaAdministracao".to_string(),
            value: "10".to_string(),
        })
        .await?;
        self.page(PageCommand::FillSelector {
            selector: "#quantidadeParcelas".to_string(),
            value: "120".to_string(),
        })
        .await?;
        self.page(PageCommand::FillSelector {
            selector: "#diaVencimento".to_string(),
            value: "10".to_string(),
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Criar Cota".to_string(),
        })
        .await?;
        self.page(PageCommand::ExpectText {
            text: "Cota criada com sucesso!".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/cotas*".to_string(),
            timeout_ms: None,
        })
        .await?;
        Ok(())
    }

    async fn resolve_quota(&mut self) -> E2eResult<()> {
        let group_id = require(&self.context.group_id, "group id for quota lookup")?;
        let participant_name = self.context.identity.participant_name.clone();

        let quotas = self.api()?.quotas_by_group(group_id).await?;
        let quota = resolve_by(&quotas, "cota recém-criada", |q| {
            q.participant
                .as_ref()
                .map(|p| p.name == participant_name)
                .unwrap_or(false)
        })?;

        if quota.status != QuotaStatus::Pending {
            return Err(E2eError::Assertion(format!(
                "quota {} expected status PENDENTE right after creation, was {}",
                quota.id, quota.status
            )));
        }

        self.context.quota = Some(QuotaRef {
            id: quota.id,
            number: quota.number,
        });
        Ok(())
    }

    async fn pay_first_installment(&mut self) -> E2eResult<()> {
        let quota = require(&self.context.quota, "quota reference for payment")?;

        let installments = self.api()?.installments(quota.id).await?;
        let first = installments
            .data
            .iter()
            .find(|i| i.number == 1)
            .or_else(|| installments.data.first())
            .ok_or_else(|| E2eError::NotResolved {
                what: "primeira parcela da cota".to_string(),
            })?;
        let first_id = first.id;

        self.api()?.pay_installment(first_id).await?;

        // Activation happens asynchronously in the backend with no push
        // signal; poll with the configured bound. Exhaustion fails the
        // step here instead of deferring to a stale final assertion.
        let policy = PollPolicy::new(
            self.config.activation_poll_attempts,
            self.config.activation_poll_delay,
        );
        let api = self.api()?;
        let outcome = poll_until(policy, move || async move {
            let current = api.quota(quota.id).await?;
            Ok(match current.status {
                QuotaStatus::ActiveCurrentNotDrawn => Observation::Ready(current.status),
                QuotaStatus::Pending => Observation::NotYet(current.status),
                QuotaStatus::Other(_) => Observation::WrongState(current.status),
            })
        })
        .await?;

        match outcome {
            PollOutcome::Satisfied { attempts, .. } => {
                info!(quota_id = quota.id, attempts, "quota activated");
            }
            PollOutcome::Exhausted { last_seen, attempts } => {
                return Err(E2eError::ActivationTimeout {
                    quota_id: quota.id,
                    attempts,
                    last_status: last_seen.to_string(),
                });
            }
            PollOutcome::WrongState { seen } => {
                return Err(E2eError::Assertion(format!(
                    "quota {} reached unexpected terminal status {}",
                    quota.id, seen
                )));
            }
        }

        // Give the installment projection a beat to catch up
        sleep(self.config.activation_poll_delay).await;

        let verified = self.api()?.installments(quota.id).await?;
        let paid = verified
            .data
            .iter()
            .find(|i| i.number == 1)
            .or_else(|| verified.data.first())
            .ok_or_else(|| E2eError::NotResolved {
                what: "primeira parcela após pagamento".to_string(),
            })?;
        if paid.status != InstallmentStatus::Paid {
            return Err(E2eError::Assertion(format!(
                "installment {} expected status PAGO after payment, was {}",
                paid.id, paid.status
            )));
        }
        Ok(())
    }

    async fn schedule_opening_assembly(&mut self) -> E2eResult<()> {
        require(&self.context.group_id, "group id for assembly scheduling")?;
        let identity = self.context.identity.clone();

        self.page(PageCommand::ClickLink {
            name: "Assembleias".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/assembleias".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ClickButton {
            name: "Agendar Assembleia".to_string(),
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/assembleias/nova".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::ExpectHeading {
            name: "Agendar Nova Assembleia|Nova Assembleia para Grupo".to_string(),
            regex: true,
            exact: false,
        })
        .await?;

        self.page(PageCommand::OpenCombobox {
            name: "Grupo de Consórcio *".to_string(),
        })
        .await?;
        self.page(PageCommand::ClickOption {
            name: identity.group_name.clone(),
            timeout_ms: None,
        })
        .await?;

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        self.page(PageCommand::FillLabel {
            label: "Data da Assembleia *".to_string(),
            value: today,
            regex: false,
        })
        .await?;

        self.page(PageCommand::OpenCombobox {
            name: "Tipo de Assembleia *".to_string(),
        })
        .await?;
        self.page(PageCommand::ClickOption {
            name: "Assembleia de Abertura".to_string(),
            timeout_ms: Some(5_000),
        })
        .await?;

        self.page(PageCommand::FillLabel {
            label: "Descrição da Assembleia".to_string(),
            value: identity.assembly_description.clone(),
            regex: false,
        })
        .await?;

        self.page(PageCommand::ClickButton {
            name: "Agendar Assembleia".to_string(),
        })
        .await?;
        self.page(PageCommand::ExpectText {
            text: "Assembleia agendada com sucesso!".to_string(),
            timeout_ms: None,
        })
        .await?;
        self.page(PageCommand::WaitForUrl {
            pattern: "**/assembleias".to_string(),
            timeout_ms: None,
        })
        .await?;

        self.page(PageCommand::ExpectCard {
            texts: vec![
                identity.group_name.clone(),
                identity.assembly_description.clone(),
            ],
            contains: Some("Abertura".to_string()),
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_is_fixed() {
        let names: Vec<&str> = StepName::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "authenticate",
                "register participant",
                "create group",
                "create quota",
                "resolve quota identifiers",
                "pay first installment and await activation",
                "schedule opening assembly",
            ]
        );
    }

    #[test]
    fn test_require_names_missing_dependency() {
        let missing: Option<i64> = None;
        let err = require(&missing, "group id for quota creation").unwrap_err();
        match err {
            E2eError::MissingDependency { what } => {
                assert_eq!(what, "group id for quota creation");
            }
            other => panic!("unexpected error: {}", other),
        }

        assert_eq!(require(&Some(7i64), "group id").unwrap(), 7);
    }

    #[tokio::test]
    async fn test_skip_outcome_runs_no_steps() {
        let report = run_scenario(ConfigOutcome::Skip {
            reason: "credentials absent".to_string(),
        })
        .await
        .unwrap();

        assert!(report.steps.is_empty());
        assert!(report.passed());
        match report.outcome {
            Outcome::Skipped { reason } => assert_eq!(reason, "credentials absent"),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_outcome_tag() {
        let report = ScenarioReport {
            outcome: Outcome::Failed {
                step: "create group",
                error: "boom".to_string(),
            },
            steps: vec![StepReport {
                name: "authenticate",
                success: true,
                duration_ms: 10,
                error: None,
            }],
            duration_ms: 12,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["step"], "create group");
        assert_eq!(json["steps"][0]["name"], "authenticate");
        assert!(!report.passed());
    }
}
