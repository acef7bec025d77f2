//! Resource Arbitration Manager
//!
//! Tracks which caller owns each [`ScarceDevice`] and serializes ownership
//! transitions per device.
//!
//! # Locking
//!
//! Each device has its own transition lock (`tokio::sync::Mutex<()>`).
//! `acquire` and `release` wait for it at most `acquire_timeout` and report
//! [`AcquireOutcome::Contended`] / [`ReleaseOutcome::Contended`] when the
//! wait runs out. `force_release` waits without a bound so that recovery
//! cannot fail spuriously. Different devices never contend.
//!
//! The ownership record itself sits behind a short-lived `RwLock` so status
//! reads never wait on a transition in progress.
//!
//! # Reconciliation
//!
//! | Pass | When | Effect |
//! |------|------|--------|
//! | orphan reconciliation | start-up | attribute devices to running holders |
//! | refresh | every `refresh_interval` | update presence, adopt new holders, clear stale owners |
//!
//! A failed detection (process table unreadable, docker erroring, presence
//! probe failing) leaves the previous state untouched.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use argos_domain::resource::{
    entities::{
        AcquireOutcome, ForceReleaseOutcome, ReleaseOutcome, ResourceEvent, ResourceState,
        ScarceDevice,
    },
    profile::DeviceProfile,
};
use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ResourceConfig;
use crate::ports::device_presence::DevicePresence;
use crate::ports::process_control::{ProcessControl, ProcessInfo, SystemError};

const EVENT_CAPACITY: usize = 64;

struct DeviceSlot {
    transition: Mutex<()>,
    state: RwLock<ResourceState>,
    profile: DeviceProfile,
}

impl DeviceSlot {
    fn new(device: ScarceDevice, profile: DeviceProfile) -> Self {
        Self {
            transition: Mutex::new(()),
            state: RwLock::new(ResourceState::vacant(device)),
            profile,
        }
    }

    fn snapshot(&self) -> ResourceState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut ResourceState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

/// Whether `process` is an instance of the binary `name`
fn process_matches(process: &ProcessInfo, name: &str) -> bool {
    if process.name == name {
        return true;
    }
    process
        .cmdline
        .split_whitespace()
        .next()
        .and_then(|exe| exe.rsplit('/').next())
        .is_some_and(|exe| exe == name)
}

/// Exclusive ownership of scarce devices
pub struct ResourceManager {
    config: ResourceConfig,
    slots: BTreeMap<ScarceDevice, DeviceSlot>,
    processes: Arc<dyn ProcessControl>,
    presence: Arc<dyn DevicePresence>,
    events: broadcast::Sender<ResourceEvent>,
    shutdown: CancellationToken,
}

impl ResourceManager {
    pub fn new(
        config: ResourceConfig,
        processes: Arc<dyn ProcessControl>,
        presence: Arc<dyn DevicePresence>,
    ) -> Self {
        let slots = config
            .profiles
            .iter()
            .map(|(device, profile)| (*device, DeviceSlot::new(*device, profile.clone())))
            .collect();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            slots,
            processes,
            presence,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    /// Construct, reconcile against running holders and start the refresh loop
    pub async fn start(
        config: ResourceConfig,
        processes: Arc<dyn ProcessControl>,
        presence: Arc<dyn DevicePresence>,
    ) -> Arc<Self> {
        let manager = Arc::new(Self::new(config, processes, presence));
        manager.reconcile_orphans().await;
        manager.spawn_refresh_loop();
        manager
    }

    /// Receive every ownership and detection event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ResourceEvent) {
        tracing::info!(device = %event.device(), ?event, "Resource event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn devices(&self) -> Vec<ScarceDevice> {
        self.slots.keys().copied().collect()
    }

    pub fn state(&self, device: ScarceDevice) -> Option<ResourceState> {
        self.slots.get(&device).map(DeviceSlot::snapshot)
    }

    /// Snapshot of every managed device
    pub fn status(&self) -> Vec<ResourceState> {
        self.slots.values().map(DeviceSlot::snapshot).collect()
    }

    pub fn is_available(&self, device: ScarceDevice) -> bool {
        self.state(device).is_some_and(|s| s.is_available)
    }

    pub fn owner(&self, device: ScarceDevice) -> Option<String> {
        self.state(device).and_then(|s| s.owner)
    }

    /// Grant `device` to `owner` if nobody holds it
    pub async fn acquire(&self, owner: &str, device: ScarceDevice) -> AcquireOutcome {
        let Some(slot) = self.slots.get(&device) else {
            return AcquireOutcome::UnknownDevice;
        };

        let Ok(_guard) = tokio::time::timeout(self.config.acquire_timeout, slot.transition.lock()).await
        else {
            tracing::warn!(device = %device, owner, "Timed out waiting for device lock");
            return AcquireOutcome::Contended;
        };

        let outcome = slot.update(|state| {
            if state.is_available {
                state.claim(owner);
                AcquireOutcome::Granted
            } else {
                AcquireOutcome::Held {
                    owner: state.owner.clone().unwrap_or_else(|| "unknown".to_string()),
                }
            }
        });

        match &outcome {
            AcquireOutcome::Granted => self.emit(ResourceEvent::Acquired {
                device,
                owner: owner.to_string(),
            }),
            other => tracing::debug!(device = %device, owner, ?other, "Acquire denied"),
        }
        outcome
    }

    /// Release `device` if `owner` holds it
    pub async fn release(&self, owner: &str, device: ScarceDevice) -> ReleaseOutcome {
        let Some(slot) = self.slots.get(&device) else {
            return ReleaseOutcome::NotOwner {
                current_owner: None,
            };
        };

        let Ok(_guard) = tokio::time::timeout(self.config.acquire_timeout, slot.transition.lock()).await
        else {
            tracing::warn!(device = %device, owner, "Timed out waiting for device lock");
            return ReleaseOutcome::Contended;
        };

        let outcome = slot.update(|state| {
            if state.is_owned_by(owner) {
                state.vacate();
                ReleaseOutcome::Released
            } else {
                ReleaseOutcome::NotOwner {
                    current_owner: state.owner.clone(),
                }
            }
        });

        if outcome.is_released() {
            self.emit(ResourceEvent::Released {
                device,
                owner: owner.to_string(),
            });
        }
        outcome
    }

    /// Kill every known holder of `device` and clear its ownership
    ///
    /// Individual kill or stop failures are logged and skipped.
    pub async fn force_release(&self, device: ScarceDevice) -> ForceReleaseOutcome {
        let Some(slot) = self.slots.get(&device) else {
            return ForceReleaseOutcome::default();
        };
        let _guard = slot.transition.lock().await;

        tracing::info!(device = %device, "Force releasing device");
        let killed_processes = self.kill_holders(device, &slot.profile).await;
        if !killed_processes.is_empty() {
            tokio::time::sleep(self.config.kill_settle).await;
        }

        let stopped_containers = self.stop_holder_containers(device, &slot.profile).await;
        if !stopped_containers.is_empty() {
            tokio::time::sleep(self.config.container_settle).await;
        }

        let previous_owner = slot.update(ResourceState::vacate);
        self.emit(ResourceEvent::ForceReleased {
            device,
            previous_owner: previous_owner.clone(),
        });

        ForceReleaseOutcome {
            previous_owner,
            killed_processes,
            stopped_containers,
        }
    }

    async fn kill_holders(&self, device: ScarceDevice, profile: &DeviceProfile) -> Vec<String> {
        if profile.processes.is_empty() && profile.scripts.is_empty() {
            return Vec::new();
        }

        let processes = match self.processes.list_processes().await {
            Ok(processes) => processes,
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Could not list processes for force release");
                return Vec::new();
            }
        };

        let mut killed = Vec::new();
        for process in &processes {
            let label = profile
                .processes
                .iter()
                .find(|name| process_matches(process, name))
                .cloned()
                .or_else(|| {
                    profile
                        .scripts
                        .iter()
                        .find(|s| process.cmdline.contains(&s.pattern))
                        .map(|s| s.label.clone())
                });
            let Some(label) = label else { continue };

            match self.processes.kill(process.pid).await {
                Ok(()) => {
                    tracing::info!(device = %device, pid = process.pid, process = %label, "Killed holder");
                    killed.push(label);
                }
                Err(e) => {
                    tracing::warn!(device = %device, pid = process.pid, error = %e, "Failed to kill holder");
                }
            }
        }
        killed
    }

    async fn stop_holder_containers(&self, device: ScarceDevice, profile: &DeviceProfile) -> Vec<String> {
        if profile.cleanup_containers.is_empty() && profile.containers.is_empty() {
            return Vec::new();
        }

        let running = match self.processes.running_containers().await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Could not list containers for force release");
                return Vec::new();
            }
        };

        let mut stopped = Vec::new();
        for name in profile.containers_to_stop() {
            if !running.iter().any(|r| r == name) {
                continue;
            }
            match self.processes.stop_container(name).await {
                Ok(()) => {
                    tracing::info!(device = %device, container = name, "Stopped holder container");
                    stopped.push(name.to_string());
                }
                Err(e) => {
                    tracing::warn!(device = %device, container = name, error = %e, "Failed to stop container");
                }
            }
        }
        stopped
    }

    /// First running holder of a device: blocking process, then script,
    /// then tool container
    async fn find_holder(&self, profile: &DeviceProfile) -> Result<Option<String>, SystemError> {
        if !profile.processes.is_empty() || !profile.scripts.is_empty() {
            let processes = self.processes.list_processes().await?;
            for name in &profile.processes {
                if processes.iter().any(|p| process_matches(p, name)) {
                    return Ok(Some(name.clone()));
                }
            }
            for script in &profile.scripts {
                if processes.iter().any(|p| p.cmdline.contains(&script.pattern)) {
                    return Ok(Some(script.label.clone()));
                }
            }
        }

        if !profile.containers.is_empty() {
            let running = self.processes.running_containers().await?;
            if let Some(container) = profile
                .containers
                .iter()
                .find(|c| running.iter().any(|r| r == *c))
            {
                return Ok(Some(container.clone()));
            }
        }

        Ok(None)
    }

    /// Attribute devices to holders that were running before this manager
    ///
    /// Runs before any caller can acquire, so it does not take the
    /// transition locks.
    pub async fn reconcile_orphans(&self) {
        for (device, slot) in &self.slots {
            match self.find_holder(&slot.profile).await {
                Ok(Some(holder)) => {
                    tracing::info!(device = %device, holder = %holder, "Device already in use at start-up");
                    slot.update(|state| {
                        state.adopt(holder.clone());
                        state.is_detected = true;
                    });
                    self.emit(ResourceEvent::OwnershipReconciled {
                        device: *device,
                        owner: Some(holder),
                    });
                }
                Ok(None) => self.refresh_presence(*device, slot).await,
                Err(e) => {
                    tracing::warn!(device = %device, error = %e, "Orphan detection failed; state unchanged");
                }
            }
        }
    }

    /// One periodic pass: presence for every device, then ownership
    pub async fn refresh(&self) {
        for (device, slot) in &self.slots {
            self.refresh_presence(*device, slot).await;
            self.refresh_ownership(*device, slot).await;
        }
    }

    async fn refresh_presence(&self, device: ScarceDevice, slot: &DeviceSlot) {
        match self.presence.is_present(device).await {
            Ok(detected) => {
                let changed = slot.update(|state| {
                    let changed = state.is_detected != detected;
                    state.is_detected = detected;
                    changed
                });
                if changed {
                    self.emit(ResourceEvent::DetectionChanged { device, detected });
                }
            }
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Presence detection failed; state unchanged");
            }
        }
    }

    async fn refresh_ownership(&self, device: ScarceDevice, slot: &DeviceSlot) {
        let Ok(_guard) = tokio::time::timeout(self.config.acquire_timeout, slot.transition.lock()).await
        else {
            tracing::debug!(device = %device, "Device busy; skipping ownership refresh");
            return;
        };

        let holder = match self.find_holder(&slot.profile).await {
            Ok(holder) => holder,
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Holder detection failed; state unchanged");
                return;
            }
        };

        let grace = chrono::Duration::from_std(self.config.ownership_grace)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let change = slot.update(|state| match (state.owner.is_some(), holder) {
            (false, Some(holder)) => {
                state.adopt(holder.clone());
                Some(Some(holder))
            }
            (true, None) => {
                let stale = state
                    .connected_since
                    .is_none_or(|since| Utc::now() - since >= grace);
                if stale {
                    state.vacate();
                    Some(None)
                } else {
                    None
                }
            }
            _ => None,
        });

        if let Some(owner) = change {
            self.emit(ResourceEvent::OwnershipReconciled { device, owner });
        }
    }

    /// Start the periodic refresh; stops on [`shutdown`](Self::shutdown) or
    /// when the manager is dropped
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let token = self.shutdown.clone();
        let period = self.config.refresh_interval.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(manager) = weak.upgrade() else { break };
                        manager.refresh().await;
                    }
                }
            }
            tracing::debug!("Resource refresh loop stopped");
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::process_control::Result as SystemResult;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FakeSystem {
        processes: StdMutex<Vec<ProcessInfo>>,
        containers: StdMutex<Vec<String>>,
        killed: StdMutex<Vec<u32>>,
        stopped: StdMutex<Vec<String>>,
        unkillable: StdMutex<Vec<u32>>,
        broken: AtomicBool,
    }

    impl FakeSystem {
        fn with_process(self, pid: u32, name: &str, cmdline: &str) -> Self {
            self.processes
                .lock()
                .unwrap()
                .push(ProcessInfo::new(pid, name, cmdline));
            self
        }

        fn with_container(self, name: &str) -> Self {
            self.containers.lock().unwrap().push(name.to_string());
            self
        }

        fn clear(&self) {
            self.processes.lock().unwrap().clear();
            self.containers.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl ProcessControl for FakeSystem {
        async fn list_processes(&self) -> SystemResult<Vec<ProcessInfo>> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(SystemError::CommandUnavailable("ps".into()));
            }
            Ok(self.processes.lock().unwrap().clone())
        }

        async fn kill(&self, pid: u32) -> SystemResult<()> {
            if self.unkillable.lock().unwrap().contains(&pid) {
                return Err(SystemError::SignalFailed {
                    pid,
                    message: "EPERM".into(),
                });
            }
            self.killed.lock().unwrap().push(pid);
            self.processes.lock().unwrap().retain(|p| p.pid != pid);
            Ok(())
        }

        async fn running_containers(&self) -> SystemResult<Vec<String>> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(SystemError::CommandFailed {
                    command: "docker ps".into(),
                    message: "daemon down".into(),
                });
            }
            Ok(self.containers.lock().unwrap().clone())
        }

        async fn stop_container(&self, name: &str) -> SystemResult<()> {
            self.stopped.lock().unwrap().push(name.to_string());
            self.containers.lock().unwrap().retain(|c| c != name);
            Ok(())
        }
    }

    struct FakePresence {
        present: StdMutex<SystemResult<bool>>,
    }

    impl FakePresence {
        fn new(present: bool) -> Self {
            Self {
                present: StdMutex::new(Ok(present)),
            }
        }

        fn set(&self, value: SystemResult<bool>) {
            *self.present.lock().unwrap() = value;
        }
    }

    #[async_trait]
    impl DevicePresence for FakePresence {
        async fn is_present(&self, _device: ScarceDevice) -> SystemResult<bool> {
            self.present.lock().unwrap().clone()
        }
    }

    fn quick_config() -> ResourceConfig {
        ResourceConfig::default()
            .with_acquire_timeout(Duration::from_millis(50))
            .with_settle_delays(Duration::ZERO, Duration::ZERO)
            .with_ownership_grace(Duration::ZERO)
    }

    fn manager_with(system: FakeSystem) -> (ResourceManager, Arc<FakeSystem>, Arc<FakePresence>) {
        let system = Arc::new(system);
        let presence = Arc::new(FakePresence::new(true));
        let manager = ResourceManager::new(quick_config(), system.clone(), presence.clone());
        (manager, system, presence)
    }

    #[tokio::test]
    async fn test_acquire_then_held() {
        let (manager, _, _) = manager_with(FakeSystem::default());
        assert_eq!(
            manager.acquire("kismet", ScarceDevice::Alfa).await,
            AcquireOutcome::Granted
        );
        assert_eq!(
            manager.acquire("wifite", ScarceDevice::Alfa).await,
            AcquireOutcome::Held {
                owner: "kismet".into()
            }
        );
        let state = manager.state(ScarceDevice::Alfa).unwrap();
        assert!(!state.is_available);
        assert_eq!(state.owner.as_deref(), Some("kismet"));
        assert!(manager.is_available(ScarceDevice::Hackrf));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_grants_exactly_one() {
        let (manager, _, _) = manager_with(FakeSystem::default());
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    manager
                        .acquire(&format!("tool-{}", i), ScarceDevice::Hackrf)
                        .await
                })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_granted() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }

    #[tokio::test]
    async fn test_release_requires_matching_owner() {
        let (manager, _, _) = manager_with(FakeSystem::default());
        manager.acquire("urh", ScarceDevice::Hackrf).await;

        let denied = manager.release("gqrx", ScarceDevice::Hackrf).await;
        assert_eq!(
            denied,
            ReleaseOutcome::NotOwner {
                current_owner: Some("urh".into())
            }
        );
        assert_eq!(manager.owner(ScarceDevice::Hackrf).as_deref(), Some("urh"));

        assert!(manager.release("urh", ScarceDevice::Hackrf).await.is_released());
        assert!(manager.is_available(ScarceDevice::Hackrf));

        let again = manager.release("urh", ScarceDevice::Hackrf).await;
        assert_eq!(again.error_message().as_deref(), Some("Not owner. Current owner: none"));
    }

    #[tokio::test]
    async fn test_unmanaged_device() {
        let system = Arc::new(FakeSystem::default());
        let manager = ResourceManager::new(
            quick_config().with_devices(&[ScarceDevice::Hackrf]),
            system,
            Arc::new(FakePresence::new(true)),
        );
        assert_eq!(
            manager.acquire("x", ScarceDevice::Bluetooth).await,
            AcquireOutcome::UnknownDevice
        );
        assert!(!manager.is_available(ScarceDevice::Bluetooth));
        assert_eq!(manager.status().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_contended_while_force_release_runs() {
        let system = Arc::new(FakeSystem::default().with_process(10, "hackrf_sweep", "hackrf_sweep -f 1:6000"));
        let config = quick_config().with_settle_delays(Duration::from_secs(2), Duration::ZERO);
        let manager = Arc::new(ResourceManager::new(
            config,
            system,
            Arc::new(FakePresence::new(true)),
        ));

        let reclaim = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.force_release(ScarceDevice::Hackrf).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(
            manager.acquire("urh", ScarceDevice::Hackrf).await,
            AcquireOutcome::Contended
        );
        assert_eq!(
            manager.release("urh", ScarceDevice::Hackrf).await,
            ReleaseOutcome::Contended
        );

        let outcome = reclaim.await.unwrap();
        assert_eq!(outcome.killed_processes, vec!["hackrf_sweep"]);
        assert!(manager.acquire("urh", ScarceDevice::Hackrf).await.is_granted());
    }

    #[tokio::test]
    async fn test_force_release_kills_holders_and_survives_failures() {
        let system = FakeSystem::default()
            .with_process(1, "hackrf_transfer", "hackrf_transfer -r out.iq")
            .with_process(2, "urh", "/usr/bin/urh")
            .with_process(3, "python3", "python3 /opt/gsm/grgsm_livemon_headless -f 935e6")
            .with_process(4, "bash", "bash")
            .with_container("openwebrx")
            .with_container("hackrf-backend")
            .with_container("postgres");
        system.unkillable.lock().unwrap().push(2);
        let (manager, system, _) = manager_with(system);
        manager.acquire("spectrum.sweep", ScarceDevice::Hackrf).await;
        let mut events = manager.subscribe();

        let outcome = manager.force_release(ScarceDevice::Hackrf).await;

        assert_eq!(outcome.previous_owner.as_deref(), Some("spectrum.sweep"));
        assert_eq!(outcome.killed_processes, vec!["hackrf_transfer", "GSM Evil"]);
        assert_eq!(*system.killed.lock().unwrap(), vec![1, 3]);
        assert_eq!(outcome.stopped_containers, vec!["openwebrx", "hackrf-backend"]);
        assert!(manager.is_available(ScarceDevice::Hackrf));
        assert_eq!(
            events.recv().await.unwrap(),
            ResourceEvent::ForceReleased {
                device: ScarceDevice::Hackrf,
                previous_owner: Some("spectrum.sweep".into())
            }
        );
    }

    #[tokio::test]
    async fn test_force_release_without_holders_still_frees() {
        let (manager, _, _) = manager_with(FakeSystem::default());
        manager.acquire("btle", ScarceDevice::Bluetooth).await;
        let outcome = manager.force_release(ScarceDevice::Bluetooth).await;
        assert!(outcome.killed_processes.is_empty());
        assert!(manager.is_available(ScarceDevice::Bluetooth));
    }

    #[tokio::test]
    async fn test_reconcile_orphans_adopts_holders() {
        let system = FakeSystem::default()
            .with_process(7, "airodump-ng", "airodump-ng wlan1mon")
            .with_container("pagermon");
        let (manager, _, presence) = manager_with(system);
        presence.set(Ok(false));

        manager.reconcile_orphans().await;

        let alfa = manager.state(ScarceDevice::Alfa).unwrap();
        assert_eq!(alfa.owner.as_deref(), Some("airodump-ng"));
        assert!(alfa.is_detected);
        assert!(!alfa.is_available);

        assert_eq!(manager.owner(ScarceDevice::Hackrf).as_deref(), Some("pagermon"));

        let bt = manager.state(ScarceDevice::Bluetooth).unwrap();
        assert!(bt.is_available);
        assert!(!bt.is_detected);
    }

    #[tokio::test]
    async fn test_reconcile_prefers_processes_over_containers() {
        let system = FakeSystem::default()
            .with_container("openwebrx")
            .with_process(5, "python3", "python3 grgsm_livemon_headless");
        let (manager, _, _) = manager_with(system);
        manager.reconcile_orphans().await;
        assert_eq!(manager.owner(ScarceDevice::Hackrf).as_deref(), Some("GSM Evil"));
    }

    #[tokio::test]
    async fn test_reconcile_failure_leaves_state_unchanged() {
        let system = FakeSystem::default().with_process(7, "kismet", "kismet");
        system.broken.store(true, Ordering::SeqCst);
        let (manager, _, _) = manager_with(system);
        manager.reconcile_orphans().await;
        assert!(manager.is_available(ScarceDevice::Alfa));
        assert!(!manager.state(ScarceDevice::Alfa).unwrap().is_detected);
    }

    #[tokio::test]
    async fn test_refresh_clears_stale_owner_and_adopts_new_holder() {
        let system = FakeSystem::default().with_process(7, "kismet", "kismet -c wlan1");
        let (manager, system, _) = manager_with(system);
        manager.reconcile_orphans().await;
        assert_eq!(manager.owner(ScarceDevice::Alfa).as_deref(), Some("kismet"));

        system.clear();
        manager.refresh().await;
        assert!(manager.is_available(ScarceDevice::Alfa));

        *system.processes.lock().unwrap() = vec![ProcessInfo::new(9, "wifite", "wifite")];
        manager.refresh().await;
        assert_eq!(manager.owner(ScarceDevice::Alfa).as_deref(), Some("wifite"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_fresh_owner_within_grace() {
        let system = Arc::new(FakeSystem::default());
        let manager = ResourceManager::new(
            quick_config().with_ownership_grace(Duration::from_secs(3600)),
            system,
            Arc::new(FakePresence::new(true)),
        );
        manager.acquire("spectrum.sweep", ScarceDevice::Hackrf).await;
        manager.refresh().await;
        assert_eq!(
            manager.owner(ScarceDevice::Hackrf).as_deref(),
            Some("spectrum.sweep")
        );
    }

    #[tokio::test]
    async fn test_refresh_keeps_owner_while_holder_runs() {
        let system = FakeSystem::default().with_process(3, "hackrf_sweep", "hackrf_sweep");
        let (manager, _, _) = manager_with(system);
        manager.acquire("spectrum.sweep", ScarceDevice::Hackrf).await;
        manager.refresh().await;
        assert_eq!(
            manager.owner(ScarceDevice::Hackrf).as_deref(),
            Some("spectrum.sweep")
        );
    }

    #[tokio::test]
    async fn test_refresh_presence_failure_keeps_detection() {
        let (manager, system, presence) = manager_with(FakeSystem::default());
        manager.refresh().await;
        assert!(manager.state(ScarceDevice::Hackrf).unwrap().is_detected);

        presence.set(Err(SystemError::Timeout("hackrf_info".into())));
        system.broken.store(true, Ordering::SeqCst);
        manager.acquire("urh", ScarceDevice::Hackrf).await;
        manager.refresh().await;

        let state = manager.state(ScarceDevice::Hackrf).unwrap();
        assert!(state.is_detected);
        assert_eq!(state.owner.as_deref(), Some("urh"));
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let (manager, _, _) = manager_with(FakeSystem::default());
        let mut events = manager.subscribe();

        manager.acquire("a", ScarceDevice::Alfa).await;
        manager.release("a", ScarceDevice::Alfa).await;

        assert_eq!(
            events.recv().await.unwrap(),
            ResourceEvent::Acquired {
                device: ScarceDevice::Alfa,
                owner: "a".into()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ResourceEvent::Released {
                device: ScarceDevice::Alfa,
                owner: "a".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_runs_until_shutdown() {
        let system = Arc::new(FakeSystem::default());
        let presence = Arc::new(FakePresence::new(false));
        let config = quick_config().with_refresh_interval(Duration::from_secs(30));
        let manager = ResourceManager::start(config, system, presence.clone()).await;
        assert!(!manager.state(ScarceDevice::Hackrf).unwrap().is_detected);

        presence.set(Ok(true));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(manager.state(ScarceDevice::Hackrf).unwrap().is_detected);

        manager.shutdown();
        presence.set(Ok(false));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(manager.state(ScarceDevice::Hackrf).unwrap().is_detected);
    }

    #[test]
    fn test_process_matches_executable_basename() {
        let p = ProcessInfo::new(1, "hackrf_transfe", "/usr/local/bin/hackrf_transfer -r x");
        assert!(process_matches(&p, "hackrf_transfer"));
        assert!(!process_matches(&p, "hackrf_sweep"));
    }
}
