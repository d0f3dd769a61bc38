//! One in-progress VM-creation workflow.

use super::navigation::NavigationState;
use super::step::WizardStep;
use crate::capability::Backend;
use crate::compiler::{CompiledConfiguration, ConfigCompiler};
use crate::materialize::{BusyGuard, MaterializeReport, MaterializeRequest, Materializer};
use crate::pipeline::CancelToken;
use crate::resolver::{ResolverTask, RestoreImageResolver, SessionUpdate};
use crate::selection::SelectionState;
use crate::vm::LiveVm;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use vmforge_shared::errors::{ConfigurationError, ValidationError, VmforgeResult};

/// Owns the selection and navigation state of one workflow.
///
/// All mutation goes through `&mut self`. Background work (restore image
/// resolution) reports back through a channel drained by
/// [`apply_pending_updates`](Self::apply_pending_updates).
pub struct WizardSession {
    selection: SelectionState,
    navigation: NavigationState,
    compiler: ConfigCompiler,
    resolver: Option<Arc<dyn RestoreImageResolver>>,
    resolution: Option<ResolverTask>,
    resolution_error: Option<String>,
    updates_tx: UnboundedSender<SessionUpdate>,
    updates_rx: UnboundedReceiver<SessionUpdate>,
    busy: Arc<AtomicBool>,
    cancel: CancelToken,
}

impl WizardSession {
    pub fn new(compiler: ConfigCompiler) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            selection: SelectionState::new(),
            navigation: NavigationState::new(),
            compiler,
            resolver: None,
            resolution: None,
            resolution_error: None,
            updates_tx,
            updates_rx,
            busy: Arc::new(AtomicBool::new(false)),
            cancel: CancelToken::new(),
        }
    }

    /// Use `resolver` to fetch the macOS platform when the MacBoot step is left
    /// without one.
    pub fn with_resolver(mut self, resolver: Arc<dyn RestoreImageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub fn current_step(&self) -> WizardStep {
        self.navigation.current()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    /// Switch the native backend on or off.
    ///
    /// Turning it on pins the architecture to the host's and clears the
    /// machine target.
    pub fn use_native_backend(&mut self, enabled: bool) {
        self.selection.set_use_native_backend(enabled);
        if enabled {
            let host = self.compiler.matrix().host().native_architecture;
            self.selection.set_architecture(Some(host));
            self.selection.set_target(None);
        }
    }

    /// Validate the current step and advance.
    ///
    /// A [`ValidationError`] leaves the step and the selection unchanged.
    pub fn next(&mut self) -> Result<WizardStep, ValidationError> {
        self.apply_pending_updates();

        let step = self.navigation.current();
        let next = self.navigation.next(&self.selection, self.compiler.matrix())?;

        if step == WizardStep::MacBoot
            && (self.selection.mac_platform().is_none()
                || self.selection.mac_recovery_image().is_none())
        {
            self.start_resolution();
        }

        Ok(next)
    }

    pub fn back(&mut self) -> WizardStep {
        self.navigation.back()
    }

    fn start_resolution(&mut self) {
        if self.resolution.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let Some(resolver) = self.resolver.clone() else {
            tracing::debug!("No restore image resolver configured");
            return;
        };
        self.resolution_error = None;
        self.resolution = ResolverTask::spawn(resolver, self.updates_tx.clone());
    }

    /// Whether a restore image resolution is still in flight.
    pub fn is_resolving(&self) -> bool {
        self.resolution
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Message from the last failed resolution, if any.
    pub fn resolution_error(&self) -> Option<&str> {
        self.resolution_error.as_deref()
    }

    /// Apply results delivered by background tasks. Returns how many were
    /// applied.
    pub fn apply_pending_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            match update {
                SessionUpdate::RestoreImageResolved(resolved) => {
                    self.selection.set_mac_platform(Some(resolved.platform));
                    self.selection.set_mac_recovery_image(Some(resolved.image));
                    self.resolution_error = None;
                }
                SessionUpdate::RestoreImageFailed(message) => {
                    self.resolution_error = Some(message);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Compile the current selection.
    pub fn generate_config(&mut self) -> Result<CompiledConfiguration, ConfigurationError> {
        self.apply_pending_updates();
        self.compiler.compile(&self.selection)
    }

    /// Whether a materialization is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start materializing `config` for the created VM.
    ///
    /// The session is busy from this call until the returned future
    /// finishes or is dropped. Fails immediately if another run is in
    /// flight.
    pub fn materialize(
        &self,
        materializer: &Materializer,
        config: CompiledConfiguration,
        vm: Arc<dyn LiveVm>,
        data_dir: PathBuf,
    ) -> impl Future<Output = VmforgeResult<MaterializeReport>> + Send + 'static {
        let guard = BusyGuard::acquire(&self.busy);
        let materializer = materializer.clone();
        let cancel = self.cancel.clone();
        let request = MaterializeRequest {
            config,
            selection: self.selection.clone(),
            data_dir,
            vm,
        };

        async move {
            let _guard = guard?;
            materializer.run(request, &cancel).await
        }
    }

    /// Stop background work for a workflow the user walked away from.
    ///
    /// Resolution is aborted; a materialization stops before its next task.
    /// Files already written stay in place.
    pub fn abandon(&mut self) {
        tracing::info!(
            step = ?self.navigation.current(),
            name = %self.selection.name(),
            "Abandoning wizard session"
        );
        self.cancel.cancel();
        self.resolution = None;
    }

    pub fn backend(&self) -> Backend {
        self.selection.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Architecture, CapabilityMatrix, HostCapabilities, OsFamily};
    use crate::disk::{DiskAllocator, NoopScopedAccess, QemuImgConverter};
    use crate::materialize::MaterializerServices;
    use crate::resolver::{MacPlatform, ResolvedRestoreImage, RestoreImage};
    use crate::vm::VmDrive;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;
    use vmforge_shared::errors::{MaterializationError, VmforgeError};

    fn host(native: bool, modern: bool) -> HostCapabilities {
        HostCapabilities {
            native_architecture: Architecture::Aarch64,
            native_backend_available: native,
            modern_native: modern,
            conversion_available: false,
        }
    }

    fn session(native: bool, modern: bool) -> WizardSession {
        WizardSession::new(ConfigCompiler::with_builtin_defaults(CapabilityMatrix::new(
            host(native, modern),
        )))
    }

    fn resolved() -> ResolvedRestoreImage {
        ResolvedRestoreImage {
            platform: MacPlatform {
                hardware_model: vec![7, 7],
                machine_identifier: None,
            },
            image: RestoreImage {
                path: PathBuf::from("/restore/UniversalMac.ipsw"),
                build_version: None,
            },
        }
    }

    struct ImmediateResolver(Result<ResolvedRestoreImage, String>);

    #[async_trait]
    impl RestoreImageResolver for ImmediateResolver {
        async fn resolve(&self) -> VmforgeResult<ResolvedRestoreImage> {
            self.0.clone().map_err(VmforgeError::Internal)
        }
    }

    /// Never finishes until notified.
    struct BlockedResolver(Arc<Notify>);

    #[async_trait]
    impl RestoreImageResolver for BlockedResolver {
        async fn resolve(&self) -> VmforgeResult<ResolvedRestoreImage> {
            self.0.notified().await;
            Ok(resolved())
        }
    }

    fn to_mac_boot(session: &mut WizardSession) {
        session.use_native_backend(true);
        session.selection_mut().set_operating_system(OsFamily::MacOs);
        session.selection_mut().set_name("mac");
        session.next().unwrap();
        session.next().unwrap();
        assert_eq!(session.current_step(), WizardStep::MacBoot);
    }

    async fn wait_for_resolution(session: &WizardSession) {
        for _ in 0..100 {
            if !session.is_resolving() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("resolution did not finish");
    }

    #[test]
    fn test_native_backend_pins_host_architecture() {
        let mut s = session(true, true);
        s.selection_mut().set_architecture(Some(Architecture::X86_64));
        s.selection_mut().set_target(Some("q35".into()));

        s.use_native_backend(true);

        assert_eq!(s.selection().architecture(), Some(Architecture::Aarch64));
        assert_eq!(s.selection().target(), None);
        assert_eq!(s.backend(), Backend::Native);
    }

    #[test]
    fn test_validation_failure_keeps_step() {
        let mut s = session(false, false);
        s.next().unwrap();
        s.next().unwrap();
        assert_eq!(s.current_step(), WizardStep::OtherBoot);

        assert_eq!(s.next(), Err(ValidationError::SelectBootImage));
        assert_eq!(s.current_step(), WizardStep::OtherBoot);
    }

    #[tokio::test]
    async fn test_mac_boot_resolution_applied_by_session() {
        let mut s = session(true, true).with_resolver(Arc::new(ImmediateResolver(Ok(resolved()))));
        to_mac_boot(&mut s);

        assert_eq!(s.next(), Ok(WizardStep::Hardware));
        wait_for_resolution(&s).await;

        // Nothing changes until the session drains its channel.
        assert!(s.selection().mac_platform().is_none());
        assert_eq!(s.apply_pending_updates(), 1);
        assert_eq!(s.selection().mac_platform(), Some(&resolved().platform));

        let config = s.generate_config().unwrap();
        assert_eq!(config.backend(), Backend::Native);
    }

    #[tokio::test]
    async fn test_mac_boot_resolution_failure_is_surfaced() {
        let mut s = session(true, true)
            .with_resolver(Arc::new(ImmediateResolver(Err("offline".into()))));
        to_mac_boot(&mut s);
        s.next().unwrap();
        wait_for_resolution(&s).await;

        assert_eq!(
            s.generate_config(),
            Err(ConfigurationError::MissingPlatform)
        );
        assert!(s.resolution_error().unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn test_next_does_not_wait_for_resolution() {
        let notify = Arc::new(Notify::new());
        let mut s = session(true, true).with_resolver(Arc::new(BlockedResolver(notify.clone())));
        to_mac_boot(&mut s);

        assert_eq!(s.next(), Ok(WizardStep::Hardware));
        assert!(s.is_resolving());
        assert_eq!(s.generate_config(), Err(ConfigurationError::MissingPlatform));

        s.abandon();
        assert!(!s.is_resolving());
    }

    #[test]
    fn test_mac_boot_without_runtime_still_advances() {
        let mut s = session(true, true).with_resolver(Arc::new(ImmediateResolver(Ok(resolved()))));
        to_mac_boot(&mut s);

        assert_eq!(s.next(), Ok(WizardStep::Hardware));
        assert!(!s.is_resolving());
    }

    #[test]
    fn test_round_trip_through_linux_kernel_wizard() {
        let mut s = session(false, false);
        s.selection_mut().set_operating_system(OsFamily::Linux);
        s.selection_mut().set_use_kernel_boot(true);
        s.selection_mut()
            .set_kernel(Some(PathBuf::from("/boot/vmlinuz")));
        s.selection_mut().set_architecture(Some(Architecture::Aarch64));
        s.selection_mut().set_target(Some("virt".into()));
        s.selection_mut().set_name("linux");

        let mut visited = vec![s.current_step()];
        while s.current_step() != WizardStep::Summary {
            let before = s.current_step();
            let next = s.next().unwrap();
            assert_eq!(s.back(), before);
            assert_eq!(s.next().unwrap(), next);
            visited.push(next);
        }

        assert_eq!(
            visited,
            vec![
                WizardStep::Start,
                WizardStep::OsSelect,
                WizardStep::LinuxBoot,
                WizardStep::Hardware,
                WizardStep::Drives,
                WizardStep::Sharing,
                WizardStep::Summary,
            ]
        );
        assert!(s.generate_config().is_ok());
    }

    struct NoDrives;

    #[async_trait]
    impl LiveVm for NoDrives {
        fn drives(&self) -> Vec<VmDrive> {
            Vec::new()
        }

        async fn change_shared_directory(&self, _path: &Path, _read_only: bool) -> VmforgeResult<()> {
            Ok(())
        }

        async fn change_medium(&self, _drive_id: &str, _path: &Path) -> VmforgeResult<()> {
            Ok(())
        }
    }

    /// Holds allocation open until released so the busy flag can be observed.
    struct GatedAllocator {
        gate: Arc<Notify>,
        calls: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl DiskAllocator for GatedAllocator {
        async fn allocate(&self, path: &Path, _size_mib: u64) -> VmforgeResult<()> {
            self.calls.lock().push(path.to_path_buf());
            self.gate.notified().await;
            Ok(())
        }
    }

    fn materializer(gate: Arc<Notify>) -> (Materializer, Arc<GatedAllocator>) {
        let allocator = Arc::new(GatedAllocator {
            gate,
            calls: Mutex::new(Vec::new()),
        });
        let services = MaterializerServices {
            allocator: allocator.clone(),
            converter: Arc::new(QemuImgConverter::default()),
            access: Arc::new(NoopScopedAccess),
        };
        (
            Materializer::new(CapabilityMatrix::new(host(false, false)), services),
            allocator,
        )
    }

    fn ready_session() -> WizardSession {
        let mut s = session(false, false);
        s.selection_mut().set_name("busy");
        s.selection_mut().set_architecture(Some(Architecture::X86_64));
        s.selection_mut().set_target(Some("q35".into()));
        s
    }

    #[tokio::test]
    async fn test_busy_while_materializing() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Notify::new());
        let (materializer, allocator) = materializer(gate.clone());
        let mut s = ready_session();
        let config = s.generate_config().unwrap();

        let run = tokio::spawn(s.materialize(
            &materializer,
            config.clone(),
            Arc::new(NoDrives),
            dir.path().join("Data"),
        ));
        assert!(s.is_busy());

        let second = s
            .materialize(&materializer, config, Arc::new(NoDrives), dir.path().join("Data"))
            .await;
        assert!(matches!(second, Err(VmforgeError::Internal(_))));
        assert!(s.is_busy());

        while allocator.calls.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        let report = run.await.unwrap().unwrap();

        assert!(!s.is_busy());
        assert_eq!(report.written, vec![dir.path().join("Data").join("data.qcow2")]);
    }

    #[tokio::test]
    async fn test_abandon_cancels_materialization() {
        let dir = TempDir::new().unwrap();
        let (materializer, allocator) = materializer(Arc::new(Notify::new()));
        let mut s = ready_session();
        let config = s.generate_config().unwrap();

        s.abandon();
        let err = s
            .materialize(&materializer, config, Arc::new(NoDrives), dir.path().join("Data"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VmforgeError::Materialization(MaterializationError::Cancelled)
        ));
        assert!(!s.is_busy());
        assert!(allocator.calls.lock().is_empty());
    }
}
