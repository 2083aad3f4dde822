//! The DAG data structure and the concurrent task execution engine that drives it: the
//! vertex/edge/task/stage types, the FIFO task queue, interruptible worker threads, the
//! scheduler that feeds them, and the layer-at-a-time DAG processor.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod dag;
pub mod edge;
pub mod processor;
pub mod queue;
pub mod scheduler;
pub mod stage;
pub mod task;
pub mod vertex;
pub mod worker;

pub use dag::{Dag, NodeIndex};
pub use edge::{Edge, EdgeStatus};
pub use processor::DagProcessor;
pub use queue::ConcurrentTaskQueue;
pub use scheduler::TaskScheduler;
pub use stage::{NoopStage, Stage};
pub use task::{CallbackPlugin, Task, TaskCallback};
pub use vertex::{Vertex, VertexStatus};
pub use worker::InterruptibleTaskThread;
