use sequin_lang::CommandNode;

use crate::args::BoundArgs;

/// Optional host callbacks observed around every dispatch. Intended for
/// tracing and debugging harnesses; absent hooks cost a branch.
#[derive(Default)]
pub struct Hooks {
    pub pre_execute: Option<Box<dyn Fn(&CommandNode)>>,
    pub post_execute: Option<Box<dyn Fn(&CommandNode, i64, bool)>>,
    pub post_unmarshal: Option<Box<dyn Fn(&BoundArgs)>>,
}

impl Hooks {
    pub(crate) fn pre(&self, cmd: &CommandNode) {
        if let Some(hook) = &self.pre_execute {
            hook(cmd);
        }
    }

    pub(crate) fn post(&self, cmd: &CommandNode, target: i64, jump: bool) {
        if let Some(hook) = &self.post_execute {
            hook(cmd, target, jump);
        }
    }

    pub(crate) fn unmarshal(&self, args: &BoundArgs) {
        if let Some(hook) = &self.post_unmarshal {
            hook(args);
        }
    }
}
