use async_recursion::async_recursion;
use std::collections::BTreeSet;

use crate::registry::NodeId;
use crate::remote::RemoteEvaluator;
use crate::render::{self, RenderContext, RenderOutcome};
use crate::trace::CascadeTrace;
use crate::widget::{Widget, WidgetKind};

use super::{Form, FormError, NodeRole};

impl Form {
    /// Refresh a cascading node and, unless `avoid_recursion` is set, every
    /// node that transitively depends on it
    ///
    /// Each node is refreshed at most once per call, so reference cycles
    /// terminate. A failing dependent is recorded in the trace and its
    /// siblings are still refreshed; only a failure of `id` itself is returned
    /// as an error.
    pub async fn update(&mut self, id: NodeId, avoid_recursion: bool) -> Result<CascadeTrace, FormError> {
        if avoid_recursion {
            log::debug!("Updating {} without cascading", self.name_of(id));
            return self.refresh(id).await;
        }
        let mut visited = BTreeSet::from([id]);
        self.cascade(id, &mut visited).await
    }

    /// Refresh `id` and its dependents, skipping nodes already in `visited`
    #[async_recursion]
    pub(super) async fn cascade(
        &mut self,
        id: NodeId,
        visited: &mut BTreeSet<NodeId>,
    ) -> Result<CascadeTrace, FormError> {
        let mut trace = self.refresh(id).await?;
        let name = trace.parameter.clone();

        for dependent in self.registry.find_dependents(&name) {
            let dependent_name = self.name_of(dependent);
            if !visited.insert(dependent) {
                log::debug!(
                    "Avoiding infinite loop: {} was already updated in this cascade",
                    dependent_name
                );
                trace.add_child(CascadeTrace::skipped(dependent_name));
                continue;
            }

            log::info!("Updating {} from {}", dependent_name, name);
            match self.cascade(dependent, visited).await {
                Ok(child) => trace.add_child(child),
                Err(error) => {
                    log::warn!("Failed to update {} from {}: {}", dependent_name, name, error);
                    trace.add_child(CascadeTrace::failed(dependent_name, &error));
                }
            }
        }

        Ok(trace)
    }

    /// Send the referenced state of one node, fetch its results and render them
    pub(super) async fn refresh(&mut self, id: NodeId) -> Result<CascadeTrace, FormError> {
        let node = self.node_ref(id)?;
        let name = node.name.clone();
        let role = node.role;
        let evaluator = node
            .evaluator
            .clone()
            .ok_or_else(|| FormError::NotRemote {
                parameter: name.clone(),
            })?;

        let state = self.referenced_parameters_as_text(id)?;
        log::debug!("Values retrieved from referenced parameters of {}: {}", name, state);
        evaluator
            .set_state(&state)
            .await
            .map_err(|e| FormError::transport(&name, e))?;

        let outcome = match role {
            NodeRole::Cascade => self.refresh_choices(id, &name, evaluator.as_ref()).await?,
            NodeRole::DynamicReference => self.refresh_content(id, &name, evaluator.as_ref()).await?,
            NodeRole::Plain => return Err(FormError::NotRemote { parameter: name }),
        };
        if outcome == RenderOutcome::Detached {
            log::debug!("{} has no widget anymore, nothing rendered", name);
        }

        Ok(CascadeTrace::updated(name).with_state(state).with_render(outcome))
    }

    async fn refresh_choices(
        &mut self,
        id: NodeId,
        name: &str,
        evaluator: &dyn RemoteEvaluator,
    ) -> Result<RenderOutcome, FormError> {
        log::debug!("Calling remote evaluator for the choices of {}", name);
        let choices = evaluator
            .get_choices()
            .await
            .map_err(|e| FormError::transport(name, e))?
            .strip_selection_markers();

        let node = self.node_mut(id)?;
        let Some(widget) = node.widget.as_mut() else {
            return Ok(RenderOutcome::Detached);
        };
        let ctx = RenderContext {
            parameter_name: &node.name,
            random_name: &node.random_name,
        };
        let outcome = render::render_choices(widget, &choices, &ctx);

        match outcome {
            RenderOutcome::Rendered { .. } => {
                if let (Some(filter), Some(options)) = (node.filter.as_mut(), widget.choice_options()) {
                    log::debug!("Updating values in filter of {}", name);
                    filter.set_snapshot(options.to_vec());
                }
            }
            RenderOutcome::Unsupported { kind } => {
                log::debug!("{} cannot show choices as a {}", name, kind);
            }
            RenderOutcome::Detached => {}
        }
        Ok(outcome)
    }

    async fn refresh_content(
        &mut self,
        id: NodeId,
        name: &str,
        evaluator: &dyn RemoteEvaluator,
    ) -> Result<RenderOutcome, FormError> {
        let Some(kind) = self.node_ref(id)?.widget.as_ref().map(Widget::kind) else {
            return Ok(RenderOutcome::Detached);
        };

        let outcome = match kind {
            WidgetKind::OrderedList | WidgetKind::UnorderedList | WidgetKind::ImageGallery => {
                let items = evaluator
                    .get_choices_as_list()
                    .await
                    .map_err(|e| FormError::transport(name, e))?;
                self.render_with(id, |widget| render::render_items(widget, &items))
            }
            WidgetKind::TextInput | WidgetKind::FormattedHtml => {
                let text = evaluator
                    .get_choices_as_string()
                    .await
                    .map_err(|e| FormError::transport(name, e))?;
                self.render_with(id, |widget| render::render_text(widget, &text))
            }
            other => {
                log::debug!("{} cannot show dynamic content as a {}", name, other);
                RenderOutcome::Unsupported { kind: other }
            }
        };
        Ok(outcome)
    }

    fn render_with<F>(&mut self, id: NodeId, render: F) -> RenderOutcome
    where
        F: FnOnce(&mut Widget) -> RenderOutcome,
    {
        match self.widget_mut(id) {
            Some(widget) => render(widget),
            None => RenderOutcome::Detached,
        }
    }
}
