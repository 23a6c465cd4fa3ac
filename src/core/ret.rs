//! The uniform result of every update: next model plus effect.

use super::cmd::Cmd;

/// Next model paired with the command to run after it is committed.
pub struct Return<Model, Msg> {
    pub model: Model,
    pub cmd: Cmd<Msg>,
}

/// Shorthand for [`Return::val`].
pub fn ret<Model, Msg: Send + 'static>(model: Model, cmd: Cmd<Msg>) -> Return<Model, Msg> {
    Return::val(model, cmd)
}

impl<Model, Msg: Send + 'static> Return<Model, Msg> {
    /// Model with no effect.
    pub fn singleton(model: Model) -> Self {
        Self {
            model,
            cmd: Cmd::None,
        }
    }

    pub fn val(model: Model, cmd: Cmd<Msg>) -> Self {
        Self { model, cmd }
    }

    pub fn into_parts(self) -> (Model, Cmd<Msg>) {
        (self.model, self.cmd)
    }

    /// Append another command after the existing one.
    pub fn with_cmd(self, cmd: Cmd<Msg>) -> Self {
        Self {
            model: self.model,
            cmd: Cmd::Batch(vec![self.cmd, cmd]),
        }
    }

    pub fn map_model<M2>(self, f: impl FnOnce(Model) -> M2) -> Return<M2, Msg> {
        Return {
            model: f(self.model),
            cmd: self.cmd,
        }
    }

    /// Rewrite every message the command can produce.
    pub fn map_msg<P, F>(self, f: F) -> Return<Model, P>
    where
        F: Fn(Msg) -> P + Send + Sync + 'static,
        P: Send + 'static,
    {
        Return {
            model: self.model,
            cmd: self.cmd.map(f),
        }
    }

    /// Embed a child update result.
    ///
    /// `self.model` is a constructor still waiting for the child's model.
    /// The result holds `constructor(child.model)` and the parent's command
    /// followed by the child's command, with every child message wrapped by
    /// `wrap`. Nested child batches are preserved; flattening is left to the
    /// effect handlers.
    ///
    /// ```
    /// use lotto_store::core::{Cmd, Return};
    ///
    /// struct Parent { count: u32, label: String }
    /// #[derive(Debug)]
    /// enum ChildMsg { Tick }
    /// #[derive(Debug)]
    /// enum ParentMsg { Child(ChildMsg) }
    ///
    /// let child: Return<u32, ChildMsg> = Return::singleton(3);
    /// let parent = Return::<_, ParentMsg>::singleton(|count| Parent { count, label: "x".into() })
    ///     .and_map_cmd(ParentMsg::Child, child);
    /// assert_eq!(parent.model.count, 3);
    /// assert!(parent.cmd.is_none());
    /// ```
    pub fn and_map_cmd<ChildModel, ChildMsg, Out, W>(
        self,
        wrap: W,
        child: Return<ChildModel, ChildMsg>,
    ) -> Return<Out, Msg>
    where
        Model: FnOnce(ChildModel) -> Out,
        ChildMsg: Send + 'static,
        W: Fn(ChildMsg) -> Msg + Send + Sync + 'static,
    {
        let constructor = self.model;
        Return {
            model: constructor(child.model),
            cmd: Cmd::Batch(vec![self.cmd, child.cmd.map(wrap)]),
        }
    }
}

impl<Model: std::fmt::Debug, Msg: std::fmt::Debug> std::fmt::Debug for Return<Model, Msg> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Return")
            .field("model", &self.model)
            .field("cmd", &self.cmd)
            .finish()
    }
}
