pub mod eval;
pub mod train;

use clap::ValueEnum;
use hand_seg::Direction;

/// Compute backend, chosen explicitly instead of probed at runtime.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum BackendArg {
    /// GPU through wgpu (Vulkan, Metal or DX12), falling back to whatever adapter wgpu finds
    #[default]
    Wgpu,
    /// CPU
    Ndarray,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DirectionArg {
    Ego,
    Front,
}

impl From<DirectionArg> for Direction {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Ego => Direction::Ego,
            DirectionArg::Front => Direction::Front,
        }
    }
}
