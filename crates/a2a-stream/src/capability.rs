use once_cell::sync::OnceCell;
use tracing::debug;

/// Engine whose native streaming fetch drops or stalls SSE bodies.
const UNRELIABLE_ENGINE_MARKER: &str = "Safari";

/// Engines that also advertise the marker above but stream correctly.
const RELIABLE_ENGINE_MARKERS: &[&str] = &["Chrome", "Chromium", "CriOS", "FxiOS", "Edg", "Android"];

static PROCESS_DETECTOR: CapabilityDetector = CapabilityDetector::new();

/// Returns `true` when `identity` names the unreliable streaming engine.
pub fn is_unreliable_runtime(identity: &str) -> bool {
    identity.contains(UNRELIABLE_ENGINE_MARKER)
        && !RELIABLE_ENGINE_MARKERS
            .iter()
            .any(|marker| identity.contains(marker))
}

/// Memoized runtime capability check.
///
/// The first call to [`detect`](Self::detect) decides for the lifetime of the
/// detector; later identity changes are not observed.
#[derive(Debug, Default)]
pub struct CapabilityDetector {
    decision: OnceCell<bool>,
}

impl CapabilityDetector {
    pub const fn new() -> Self {
        Self {
            decision: OnceCell::new(),
        }
    }

    /// Whether the native streaming path is unreliable and the fallback
    /// transport must be used.
    pub fn detect(&self, identity: &str) -> bool {
        *self.decision.get_or_init(|| decide(identity))
    }
}

/// Process-wide memoized decision.
///
/// The first identity string seen by any client decides for every client
/// created later in the process.
pub fn detect_process(identity: &str) -> bool {
    PROCESS_DETECTOR.detect(identity)
}

fn decide(identity: &str) -> bool {
    let unreliable = is_unreliable_runtime(identity);
    debug!(identity, unreliable, "detected runtime streaming capability");
    unreliable
}
