//! # Feature Engine
//!
//! 双树特征执行引擎：信号树驱动硬件，数据树处理相机帧。
//!
//! 负责：
//! - 由特征列表构建同构的信号树 / 数据树 (`load_features`)
//! - 按逻辑步 (一帧) 推进两棵树 (`SignalContainer` / `DataContainer`)
//! - `need_response` 节点的响应交汇
//! - 停止信号、数据线程暂停、清理
//!
//! ## 使用示例
//!
//! ```ignore
//! use feature_engine::{load_features, FeatureContext, FeatureRegistry};
//!
//! let list = registry.resolve(&plan.features)?;
//! let (mut signal, mut data) = load_features(&ctx, &list)?;
//!
//! // signal thread, once per frame
//! signal.run()?;
//! microscope.snap(frame_id)?;
//! signal.run_response()?;
//!
//! // data thread, once per delivered frame
//! data.run(&[frame_id])?;
//! ```

mod builder;
mod container;
mod context;
mod control;
mod descriptor;
mod error;
mod node;
mod registry;
mod rendezvous;
mod stop;
mod tree;

#[cfg(test)]
mod testing;

pub use builder::{build_trees, load_features, FeatureTrees};
pub use container::{CleanupScope, DataContainer, SignalContainer};
pub use context::FeatureContext;
pub use control::{AcquisitionControl, DataThreadGate};
pub use descriptor::{FeatureDescriptor, FeatureElement, FeatureFactory, FeatureList};
pub use error::{EngineError, Side};
pub use node::{DataNode, Links, NodeId, NodeInfo, NodeRole, SignalNode, TreeNode};
pub use registry::FeatureRegistry;
pub use rendezvous::{response_slot, Cancelled, ResponseReceiver, ResponseSender};
pub use stop::StopSignal;
pub use tree::{is_isomorphic, Tree};
