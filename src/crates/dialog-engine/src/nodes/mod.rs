//! The node set (spec §4.3): one module per kind, registered by `type`
//! string into a [`crate::node::NodeRegistry`].

mod alert;
mod begin;
mod branching_conditions;
mod branching_prompt;
mod custom;
mod echo;
mod embed_dialog;
mod end;
mod external_choice;
mod http_response_branch;
mod if_node;
mod interrupt;
mod interrupt_resume;
mod loop_node;
mod pause;
mod prompt;
mod random_branch;
mod record_variable;
mod time_elapsed_interrupt;
mod update_variable;

pub use alert::Alert;
pub use begin::Begin;
pub use branching_conditions::BranchingConditions;
pub use branching_prompt::BranchingPrompt;
pub use custom::Custom;
pub use echo::Echo;
pub use embed_dialog::EmbedDialog;
pub use end::End;
pub use external_choice::ExternalChoice;
pub use http_response_branch::HttpResponseBranch;
pub use if_node::IfNode;
pub use interrupt::Interrupt;
pub use interrupt_resume::InterruptResume;
pub use loop_node::LoopNode;
pub use pause::Pause;
pub use prompt::Prompt;
pub use random_branch::RandomBranch;
pub use record_variable::RecordVariable;
pub use time_elapsed_interrupt::TimeElapsedInterrupt;
pub use update_variable::UpdateVariable;

use crate::node::NodeRegistry;

/// The sentinel id the machine assigns a synthesized `end` node when
/// parsing discovers a missing next-node edge (spec §4.1).
pub const MISSING_NEXT_NODE_KEY: &str = "__missing_next_node__";

pub fn register_builtins(registry: &mut NodeRegistry) {
    registry
        .register("begin", begin::parse)
        .register("end", end::parse)
        .register("echo", echo::parse)
        .register("alert", alert::parse)
        .register("pause", pause::parse)
        .register("prompt", prompt::parse)
        .register("branch-prompt", branching_prompt::parse)
        .register("external-choice", external_choice::parse)
        .register("random-branch", random_branch::parse)
        .register("if", if_node::parse)
        .register("branch-conditions", branching_conditions::parse)
        .register("loop", loop_node::parse)
        .register("interrupt", interrupt::parse)
        .register("interrupt-resume", interrupt_resume::parse)
        .register("time-elapsed-interrupt", time_elapsed_interrupt::parse)
        .register("record-variable", record_variable::parse)
        .register("update-variable", update_variable::parse)
        .register("custom", custom::parse)
        .register("http-response-branch", http_response_branch::parse)
        .register("embed-dialog", embed_dialog::parse);
}
